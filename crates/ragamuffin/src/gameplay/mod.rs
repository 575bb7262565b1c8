//! Town life: the people, the law and the gangs.

pub mod disguise;
pub mod gang;
pub mod npc;
pub mod pathfinding;
pub mod police;
