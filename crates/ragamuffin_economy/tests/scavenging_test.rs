//! End-to-end economy flows: scavenge, craft, shop, gamble.

use ragamuffin_economy::{
    Bookmaker, DropRoller, DropTables, EconomyError, Inventory, Material, RecipeBook, ShopCatalogue,
    Wallet,
};
use ragamuffin_world::{BlockType, LandmarkType, PropType};

#[test]
fn test_scavenge_a_shelter_and_a_fire() {
    let tables = DropTables::default();
    let graph = RecipeBook::builtin().into_graph().unwrap();
    let mut roller = DropRoller::new(2024);
    let mut inventory = Inventory::new();

    // Raid bins until there is enough cardboard for walls and a fire
    let mut bins = 0;
    while inventory.count(Material::Cardboard) < 9 {
        for stack in roller.roll_prop(&tables, PropType::Bin) {
            inventory.add(stack.material, stack.count).unwrap();
        }
        bins += 1;
        assert!(bins < 20, "bins should give cardboard every time");
    }

    // A tree trunk gives wood, wood gives planks
    for stack in roller.roll_block(&tables, BlockType::Wood, None) {
        inventory.add(stack.material, stack.count).unwrap();
    }
    graph.craft(&mut inventory, RecipeBook::PLANKS).unwrap();
    graph.craft(&mut inventory, RecipeBook::CAMPFIRE).unwrap();
    graph.craft(&mut inventory, RecipeBook::SHELTER_WALL).unwrap();
    graph.craft(&mut inventory, RecipeBook::SHELTER_WALL).unwrap();

    assert_eq!(inventory.count(Material::Campfire), 1);
    assert_eq!(inventory.count(Material::ShelterWall), 4);
    assert_eq!(Material::ShelterWall.placeable_block(), Some(BlockType::Cardboard));
    assert_eq!(Material::Campfire.placeable_block(), Some(BlockType::Campfire));
}

#[test]
fn test_fence_jewellery_then_buy_breakfast() {
    let shops = ShopCatalogue::default();
    let graph = RecipeBook::builtin().into_graph().unwrap();
    let mut wallet = Wallet::default();
    let mut inventory = Inventory::new();
    inventory.add(Material::GoldRing, 1).unwrap();

    shops.sell(&mut wallet, &mut inventory, LandmarkType::Jeweller, Material::GoldRing, 1).unwrap();
    assert_eq!(wallet.balance(), 1_500);

    shops.buy(&mut wallet, &mut inventory, LandmarkType::Supermarket, Material::Bread, 1).unwrap();
    shops.buy(&mut wallet, &mut inventory, LandmarkType::Supermarket, Material::Bacon, 1).unwrap();
    graph.craft(&mut inventory, RecipeBook::BACON_BUTTY).unwrap();

    assert_eq!(inventory.count(Material::BaconButty), 1);
    assert_eq!(wallet.balance(), 1_500 - 95 - 250);
    assert!(Material::BaconButty.food_value().unwrap() > Material::Bread.food_value().unwrap());
}

#[test]
fn test_cannot_gamble_money_you_do_not_have() {
    let mut bookie = Bookmaker::new(3, 10, 5_000);
    let mut wallet = Wallet::new(50);
    let result = bookie.place_bet(&mut wallet, 0, 100);
    assert_eq!(result, Err(EconomyError::InsufficientFunds { price: 100, balance: 50 }));

    bookie.place_bet(&mut wallet, 1, 50).unwrap();
    let race = bookie.settle(&mut wallet);
    assert_eq!(wallet.balance(), race.payout);
}
