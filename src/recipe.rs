//! Named recipes and goal resolution.
//!
//! A [`BuildContext`] maps recipe names to an action plus the names of the
//! recipes it depends on. Running a goal runs its dependencies first, in
//! declaration order, then its own action. Dependencies are looked up by
//! name when they are reached, never when the recipe is defined, and nothing
//! is memoized: a dependency shared by two recipes runs once per path.
//!
//! The action type is generic. The script engine stores Rhai closures; tests
//! store plain tags.

use crate::error::BuildError;
use std::cell::RefCell;
use std::collections::HashMap;

/// Dependency chains nesting deeper than this fail with [`BuildError::GoalDepth`].
pub const MAX_GOAL_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe<A> {
    pub name: String,
    pub action: A,
    pub dependencies: Vec<String>,
}

/// Recipe registry plus the default goal, for one run of a build script.
#[derive(Debug)]
pub struct BuildContext<A> {
    recipes: HashMap<String, Recipe<A>>,
    default_goal: Option<String>,
}

impl<A> Default for BuildContext<A> {
    fn default() -> Self {
        Self {
            recipes: HashMap::new(),
            default_goal: None,
        }
    }
}

impl<A> BuildContext<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, replacing any earlier recipe of the same name.
    /// Returns the replaced recipe.
    pub fn define_recipe(
        &mut self,
        name: impl Into<String>,
        action: A,
        dependencies: Vec<String>,
    ) -> Option<Recipe<A>> {
        let name = name.into();
        self.recipes.insert(
            name.clone(),
            Recipe {
                name,
                action,
                dependencies,
            },
        )
    }

    /// Last call wins.
    pub fn set_default_goal(&mut self, name: impl Into<String>) {
        self.default_goal = Some(name.into());
    }

    pub fn default_goal(&self) -> Option<&str> {
        self.default_goal.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Recipe<A>> {
        self.recipes.get(name)
    }

    /// All recipes, sorted by name.
    pub fn recipes(&self) -> Vec<&Recipe<A>> {
        let mut all: Vec<&Recipe<A>> = self.recipes.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Something recipes can be fetched from by name.
///
/// Lookups hand back an owned recipe so no borrow is held while its action
/// runs; actions are free to define more recipes.
pub trait RecipeLookup<A> {
    fn lookup(&self, name: &str) -> Option<Recipe<A>>;
}

impl<A: Clone> RecipeLookup<A> for BuildContext<A> {
    fn lookup(&self, name: &str) -> Option<Recipe<A>> {
        self.get(name).cloned()
    }
}

impl<A: Clone> RecipeLookup<A> for RefCell<BuildContext<A>> {
    fn lookup(&self, name: &str) -> Option<Recipe<A>> {
        self.borrow().lookup(name)
    }
}

/// Which recipe the entry point should run: an explicit request always beats
/// the configured default, and having neither means running nothing.
pub fn select_goal<'a>(requested: Option<&'a str>, default_goal: Option<&'a str>) -> Option<&'a str> {
    requested.or(default_goal)
}

/// Run `name`: its dependencies first, in order, then its own action through
/// `invoke`.
pub fn run_goal<A, L, F>(registry: &L, name: &str, invoke: &mut F) -> Result<(), BuildError>
where
    L: RecipeLookup<A> + ?Sized,
    F: FnMut(&Recipe<A>) -> Result<(), BuildError>,
{
    run_at_depth(registry, name, invoke, 0)
}

fn run_at_depth<A, L, F>(
    registry: &L,
    name: &str,
    invoke: &mut F,
    depth: usize,
) -> Result<(), BuildError>
where
    L: RecipeLookup<A> + ?Sized,
    F: FnMut(&Recipe<A>) -> Result<(), BuildError>,
{
    if depth > MAX_GOAL_DEPTH {
        return Err(BuildError::GoalDepth(name.to_string()));
    }

    let recipe = registry
        .lookup(name)
        .ok_or_else(|| BuildError::UnknownRecipe(name.to_string()))?;

    for dependency in &recipe.dependencies {
        run_at_depth(registry, dependency, invoke, depth + 1)?;
    }

    invoke(&recipe)
}
