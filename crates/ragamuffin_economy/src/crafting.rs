//! # Crafting
//!
//! Turning rubbish into something useful. Recipes form a graph: one edge
//! per material that one recipe makes and another eats. A loop in that graph
//! would let a player turn one plank into two forever, so a book that
//! contains one is refused before play starts.
//!
//! A craft either takes every input and gives every output, or leaves the
//! pockets exactly as they were.
//!
//! ## Example
//!
//! ```rust,ignore
//! let graph = RecipeBook::builtin().into_graph()?;
//!
//! inventory.add(Material::Wood, 1)?;
//! graph.craft(&mut inventory, RecipeBook::PLANKS)?;
//! assert_eq!(inventory.count(Material::Planks), 4);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::error::{EconomyError, EconomyResult};
use crate::inventory::Inventory;
use crate::material::Material;

/// Unique identifier for a recipe.
pub type RecipeId = u32;

/// Input or output item in a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeItem {
    /// The material.
    pub material: Material,
    /// Quantity required/produced.
    pub quantity: u32,
}

impl RecipeItem {
    /// Creates a new recipe item.
    #[inline]
    #[must_use]
    pub const fn new(material: Material, quantity: u32) -> Self {
        Self { material, quantity }
    }
}

/// A crafting recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique recipe identifier.
    pub id: RecipeId,
    /// Human-readable name.
    pub name: String,
    /// Items consumed by this recipe.
    pub inputs: Vec<RecipeItem>,
    /// Items produced by this recipe.
    pub outputs: Vec<RecipeItem>,
}

impl Recipe {
    /// Creates a new recipe with basic validation.
    ///
    /// # Errors
    ///
    /// Returns error if recipe has no inputs or outputs, or a zero quantity.
    pub fn new(
        id: RecipeId,
        name: impl Into<String>,
        inputs: Vec<RecipeItem>,
        outputs: Vec<RecipeItem>,
    ) -> EconomyResult<Self> {
        let recipe = Self { id, name: name.into(), inputs, outputs };
        recipe.validate()?;
        Ok(recipe)
    }

    fn validate(&self) -> EconomyResult<()> {
        if self.inputs.is_empty() {
            return Err(EconomyError::InvalidConfig(format!(
                "recipe '{}' must have at least one input",
                self.name
            )));
        }
        if self.outputs.is_empty() {
            return Err(EconomyError::InvalidConfig(format!(
                "recipe '{}' must have at least one output",
                self.name
            )));
        }
        if self.inputs.iter().chain(&self.outputs).any(|item| item.quantity == 0) {
            return Err(EconomyError::InvalidConfig(format!(
                "recipe '{}' has a zero quantity",
                self.name
            )));
        }
        Ok(())
    }
}

/// Recipes linked by the materials they pass between each other.
#[derive(Debug, Default)]
pub struct CraftingGraph {
    recipes: BTreeMap<RecipeId, Recipe>,
    /// Who makes each material.
    producers: HashMap<Material, Vec<RecipeId>>,
    /// Who eats each material.
    consumers: HashMap<Material, Vec<RecipeId>>,
    validated: bool,
}

impl CraftingGraph {
    /// Creates a new empty crafting graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a recipe to the graph.
    ///
    /// # Errors
    ///
    /// Returns error if recipe ID already exists.
    pub fn add_recipe(&mut self, recipe: Recipe) -> EconomyResult<()> {
        if self.recipes.contains_key(&recipe.id) {
            return Err(EconomyError::InvalidConfig(format!(
                "recipe ID {} already exists",
                recipe.id
            )));
        }

        for input in &recipe.inputs {
            self.consumers.entry(input.material).or_default().push(recipe.id);
        }
        for output in &recipe.outputs {
            self.producers.entry(output.material).or_default().push(recipe.id);
        }

        self.recipes.insert(recipe.id, recipe);
        self.validated = false;

        Ok(())
    }

    /// Gets a recipe by ID.
    #[must_use]
    pub fn get_recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    /// Finds a recipe by name, ignoring case.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes.values().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Returns all recipes in id order.
    pub fn all_recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Returns the number of recipes.
    #[must_use]
    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// True when no chain of recipes feeds back into itself.
    ///
    /// Kahn's algorithm: peel off recipes nothing else feeds until none are
    /// left, or until only a loop remains.
    #[must_use]
    pub fn validate_no_cycles(&mut self) -> bool {
        if self.validated {
            return true;
        }

        // Recipe A -> recipe B if A produces something B consumes
        let mut in_degree: HashMap<RecipeId, usize> =
            self.recipes.keys().map(|&id| (id, 0)).collect();
        let mut adjacency: HashMap<RecipeId, Vec<RecipeId>> = HashMap::new();

        for (&recipe_id, recipe) in &self.recipes {
            for input in &recipe.inputs {
                // A recipe that makes its own input is a loop of one
                for &producer_id in self.producers.get(&input.material).into_iter().flatten() {
                    adjacency.entry(producer_id).or_default().push(recipe_id);
                    *in_degree.entry(recipe_id).or_insert(0) += 1;
                }
            }
        }

        let mut queue: VecDeque<RecipeId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut sorted_count = 0;
        while let Some(recipe_id) = queue.pop_front() {
            sorted_count += 1;
            for &neighbor in adjacency.get(&recipe_id).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(&neighbor) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        self.validated = sorted_count == self.recipes.len();
        self.validated
    }

    /// One loop of recipes, if there is one, as a path that starts and ends
    /// on the same recipe.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<RecipeId>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for &start_id in self.recipes.keys() {
            if !visited.contains(&start_id) {
                if let Some(cycle) =
                    self.dfs_find_cycle(start_id, &mut visited, &mut rec_stack, &mut path)
                {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn dfs_find_cycle(
        &self,
        recipe_id: RecipeId,
        visited: &mut HashSet<RecipeId>,
        rec_stack: &mut HashSet<RecipeId>,
        path: &mut Vec<RecipeId>,
    ) -> Option<Vec<RecipeId>> {
        visited.insert(recipe_id);
        rec_stack.insert(recipe_id);
        path.push(recipe_id);

        if let Some(recipe) = self.recipes.get(&recipe_id) {
            for output in &recipe.outputs {
                for &consumer_id in self.consumers.get(&output.material).into_iter().flatten() {
                    if !visited.contains(&consumer_id) {
                        if let Some(cycle) =
                            self.dfs_find_cycle(consumer_id, visited, rec_stack, path)
                        {
                            return Some(cycle);
                        }
                    } else if rec_stack.contains(&consumer_id) {
                        let cycle_start =
                            path.iter().position(|&id| id == consumer_id).unwrap_or(0);
                        let mut cycle = path[cycle_start..].to_vec();
                        cycle.push(consumer_id);
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        rec_stack.remove(&recipe_id);
        None
    }

    /// Checks if a recipe can be crafted from the inventory.
    ///
    /// # Errors
    ///
    /// `RecipeNotFound` for unknown ids, `InsufficientMaterials` naming the
    /// first missing input.
    pub fn can_craft(&self, inventory: &Inventory, recipe_id: RecipeId) -> EconomyResult<&Recipe> {
        let recipe = self
            .recipes
            .get(&recipe_id)
            .ok_or(EconomyError::RecipeNotFound(recipe_id))?;

        for input in &recipe.inputs {
            let available = inventory.count(input.material);
            if available < input.quantity {
                return Err(EconomyError::InsufficientMaterials {
                    material: input.material,
                    required: input.quantity,
                    available,
                });
            }
        }

        Ok(recipe)
    }

    /// Recipes the inventory can currently make, in id order.
    #[must_use]
    pub fn craftable(&self, inventory: &Inventory) -> Vec<RecipeId> {
        self.recipes
            .keys()
            .copied()
            .filter(|&id| self.can_craft(inventory, id).is_ok())
            .collect()
    }

    /// Crafts `recipe_id` out of `inventory`. On any failure the pockets are
    /// rolled back to a snapshot taken first.
    ///
    /// # Errors
    ///
    /// [`EconomyError::RecipeNotFound`], [`EconomyError::InsufficientMaterials`]
    /// or [`EconomyError::InventoryFull`] when the outputs do not fit.
    pub fn craft(&self, inventory: &mut Inventory, recipe_id: RecipeId) -> EconomyResult<CraftResult> {
        let recipe = self.can_craft(inventory, recipe_id)?;

        let snapshot = inventory.snapshot();

        for input in &recipe.inputs {
            if let Err(e) = inventory.remove(input.material, input.quantity) {
                inventory.restore(&snapshot);
                return Err(e);
            }
        }

        for output in &recipe.outputs {
            if let Err(e) = inventory.add(output.material, output.quantity) {
                inventory.restore(&snapshot);
                return Err(e);
            }
        }

        debug!(recipe = %recipe.name, "crafted");

        Ok(CraftResult {
            recipe_id,
            outputs: recipe.outputs.clone(),
        })
    }
}

/// What a craft made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CraftResult {
    /// Recipe used.
    pub recipe_id: RecipeId,
    /// Items produced.
    pub outputs: Vec<RecipeItem>,
}

/// A set of recipes in its TOML form.
///
/// ```toml
/// [[recipes]]
/// id = 1
/// name = "Planks"
/// inputs = [{ material = "Wood", quantity = 1 }]
/// outputs = [{ material = "Planks", quantity = 4 }]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBook {
    /// The recipes.
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

impl RecipeBook {
    /// Wood into planks.
    pub const PLANKS: RecipeId = 1;
    /// Scrap metal into a crowbar.
    pub const CROWBAR: RecipeId = 2;
    /// Planks and cardboard into a campfire.
    pub const CAMPFIRE: RecipeId = 3;
    /// Cardboard and newspaper into a sleeping bag.
    pub const SLEEPING_BAG: RecipeId = 4;
    /// Cardboard into shelter walls.
    pub const SHELTER_WALL: RecipeId = 5;
    /// Bread and bacon into a butty.
    pub const BACON_BUTTY: RecipeId = 6;

    /// The recipes every new game starts with.
    #[must_use]
    pub fn builtin() -> Self {
        use Material as M;
        let recipe = |id, name: &str, inputs: &[(Material, u32)], outputs: &[(Material, u32)]| Recipe {
            id,
            name: name.to_string(),
            inputs: inputs.iter().map(|&(m, q)| RecipeItem::new(m, q)).collect(),
            outputs: outputs.iter().map(|&(m, q)| RecipeItem::new(m, q)).collect(),
        };

        Self {
            recipes: vec![
                recipe(Self::PLANKS, "Planks", &[(M::Wood, 1)], &[(M::Planks, 4)]),
                recipe(Self::CROWBAR, "Crowbar", &[(M::ScrapMetal, 3)], &[(M::Crowbar, 1)]),
                recipe(
                    Self::CAMPFIRE,
                    "Campfire",
                    &[(M::Planks, 3), (M::Cardboard, 1)],
                    &[(M::Campfire, 1)],
                ),
                recipe(
                    Self::SLEEPING_BAG,
                    "Sleeping bag",
                    &[(M::Cardboard, 3), (M::Newspaper, 2)],
                    &[(M::SleepingBag, 1)],
                ),
                recipe(
                    Self::SHELTER_WALL,
                    "Cardboard box shelter wall",
                    &[(M::Cardboard, 4)],
                    &[(M::ShelterWall, 2)],
                ),
                recipe(
                    Self::BACON_BUTTY,
                    "Bacon butty",
                    &[(M::Bread, 1), (M::Bacon, 1)],
                    &[(M::BaconButty, 1)],
                ),
            ],
        }
    }

    /// Parses a recipe book from TOML.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for malformed TOML or invalid recipes.
    pub fn from_toml_str(text: &str) -> EconomyResult<Self> {
        let book: Self =
            toml::from_str(text).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        for recipe in &book.recipes {
            recipe.validate()?;
        }
        Ok(book)
    }

    /// Builds the crafting graph and checks it is acyclic.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for duplicate ids, `CycleDetected` naming a recipe on
    /// the cycle.
    pub fn into_graph(self) -> EconomyResult<CraftingGraph> {
        let mut graph = CraftingGraph::new();
        for recipe in self.recipes {
            graph.add_recipe(recipe)?;
        }
        if !graph.validate_no_cycles() {
            let at = graph.find_cycle().and_then(|c| c.first().copied()).unwrap_or(0);
            return Err(EconomyError::CycleDetected(at));
        }
        Ok(graph)
    }
}
