//! Benchmark for crafting and drop rolling.
//!
//! Run with: cargo bench --package ragamuffin_economy --bench crafting_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ragamuffin_economy::{
    CraftingGraph, DropRoller, DropTables, Inventory, Material, Recipe, RecipeBook, RecipeItem,
};
use ragamuffin_world::{BlockType, LandmarkType};

/// A long linear chain: material i -> material i + 1.
fn create_chain_graph() -> CraftingGraph {
    let mut graph = CraftingGraph::new();
    for (i, pair) in Material::ALL.windows(2).enumerate() {
        let recipe = Recipe::new(
            i as u32,
            format!("Step_{i}"),
            vec![RecipeItem::new(pair[0], 1)],
            vec![RecipeItem::new(pair[1], 1)],
        )
        .unwrap();
        graph.add_recipe(recipe).unwrap();
    }
    graph
}

fn benchmark_cycle_detection(c: &mut Criterion) {
    c.bench_function("cycle_detection_chain", |b| {
        b.iter(|| {
            let mut graph = create_chain_graph();
            black_box(graph.validate_no_cycles())
        });
    });
}

fn benchmark_craftable(c: &mut Criterion) {
    let graph = RecipeBook::builtin().into_graph().unwrap();
    let mut inventory = Inventory::new();
    for material in [Material::Wood, Material::Cardboard, Material::Newspaper, Material::ScrapMetal] {
        inventory.add(material, 32).unwrap();
    }

    c.bench_function("craftable_listing", |b| {
        b.iter(|| black_box(graph.craftable(&inventory)));
    });
}

fn benchmark_craft_transaction(c: &mut Criterion) {
    let graph = RecipeBook::builtin().into_graph().unwrap();

    c.bench_function("craft_planks_then_campfire", |b| {
        b.iter(|| {
            let mut inventory = Inventory::new();
            inventory.add(Material::Wood, 1).unwrap();
            inventory.add(Material::Cardboard, 1).unwrap();
            graph.craft(&mut inventory, RecipeBook::PLANKS).unwrap();
            black_box(graph.craft(&mut inventory, RecipeBook::CAMPFIRE))
        });
    });
}

fn benchmark_drop_rolls(c: &mut Criterion) {
    let tables = DropTables::default();
    let mut roller = DropRoller::new(42);

    c.bench_function("roll_jeweller_brick", |b| {
        b.iter(|| black_box(roller.roll_block(&tables, BlockType::Brick, Some(LandmarkType::Jeweller))));
    });
}

criterion_group!(
    benches,
    benchmark_cycle_detection,
    benchmark_craftable,
    benchmark_craft_transaction,
    benchmark_drop_rolls,
);
criterion_main!(benches);
