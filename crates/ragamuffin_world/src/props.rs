//! # Props
//!
//! Street furniture that is not made of blocks: benches, bins, lampposts,
//! phone boxes and the like. Each prop has its own collision box and a small
//! pool of hit points so it can be smashed up.
//!
//! Props are placed per town cell and handed out per chunk, so the same prop
//! always comes back with the same id when its chunk is reloaded.

use crate::aabb::Aabb;
use crate::chunk::{ChunkCoord, CHUNK_SIZE, SURFACE_Y};
use crate::town::{CellCoord, PlotKind, TownPlan, PLOT_SIZE};

/// Stable identifier of a prop, derived from seed and position.
pub type PropId = u64;

/// Kind of street furniture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropType {
    /// Park bench.
    Bench,
    /// Wheelie bin.
    Bin,
    /// Street light.
    Lamppost,
    /// Red phone box.
    PhoneBox,
    /// Bus shelter.
    BusShelter,
    /// Short metal post.
    Bollard,
    /// Royal Mail pillar box.
    Postbox,
}

impl PropType {
    /// Every prop kind.
    pub const ALL: [Self; 7] = [
        Self::Bench,
        Self::Bin,
        Self::Lamppost,
        Self::PhoneBox,
        Self::BusShelter,
        Self::Bollard,
        Self::Postbox,
    ];

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bench => "bench",
            Self::Bin => "bin",
            Self::Lamppost => "lamppost",
            Self::PhoneBox => "phone box",
            Self::BusShelter => "bus shelter",
            Self::Bollard => "bollard",
            Self::Postbox => "postbox",
        }
    }

    /// Width along x, height, and depth along z when unrotated.
    #[must_use]
    pub const fn size(self) -> [f32; 3] {
        match self {
            Self::Bench => [1.6, 0.9, 0.5],
            Self::Bin => [0.6, 1.0, 0.6],
            Self::Lamppost => [0.3, 4.0, 0.3],
            Self::PhoneBox => [1.0, 2.5, 1.0],
            Self::BusShelter => [3.0, 2.5, 1.2],
            Self::Bollard => [0.3, 1.0, 0.3],
            Self::Postbox => [0.6, 1.4, 0.6],
        }
    }

    /// Punches needed to destroy the prop.
    #[must_use]
    pub const fn hit_points(self) -> u32 {
        match self {
            Self::Bin => 2,
            Self::Bench => 4,
            Self::Bollard => 5,
            Self::PhoneBox | Self::BusShelter | Self::Postbox => 6,
            Self::Lamppost => 8,
        }
    }
}

/// A placed prop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropPosition {
    /// Stable id.
    pub id: PropId,
    /// What it is.
    pub kind: PropType,
    /// Centre of the footprint at ground level.
    pub position: [f32; 3],
    /// Rotation about Y in degrees. Only multiples of 90 are used.
    pub yaw: f32,
}

impl PropPosition {
    fn new(plan: &TownPlan, kind: PropType, position: [f32; 3], yaw: f32) -> Self {
        let id = plan
            .seed()
            .derive(0x5052_4f50 + kind as u64)
            .hash2((position[0] * 2.0) as i32, (position[2] * 2.0) as i32);
        Self { id, kind, position, yaw }
    }

    /// World-space collision box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        let [w, h, d] = self.kind.size();
        let rotated = (self.yaw.rem_euclid(180.0) - 90.0).abs() < 1.0;
        let (hx, hz) = if rotated { (d / 2.0, w / 2.0) } else { (w / 2.0, d / 2.0) };
        let [x, y, z] = self.position;
        Aabb::new([x - hx, y, z - hz], [x + hx, y + h, z + hz])
    }

    /// Chunk holding the prop's centre.
    #[must_use]
    pub fn chunk(&self) -> ChunkCoord {
        ChunkCoord::from_world_pos(self.position[0], self.position[2])
    }
}

/// All props of one town cell.
#[must_use]
pub fn props_for_cell(plan: &TownPlan, cell: CellCoord) -> Vec<PropPosition> {
    let ox = cell.origin_x() as f32;
    let oz = cell.origin_z() as f32;
    let ground = (SURFACE_Y + 1) as f32;
    let at = |lx: f32, lz: f32| [ox + lx, ground, oz + lz];
    let roll = plan.seed().derive(0x4655_524e).hash2(cell.x, cell.z);

    let mut props = vec![
        // Street light on the front pavement, clear of the door
        PropPosition::new(plan, PropType::Lamppost, at(9.5, 4.5), 0.0),
    ];

    match plan.plot(cell) {
        PlotKind::Park => {
            let px = (cell.plot_x() - cell.origin_x()) as f32;
            let pz = (cell.plot_z() - cell.origin_z()) as f32;
            let mid = PLOT_SIZE as f32 / 2.0;
            props.push(PropPosition::new(plan, PropType::Bench, at(px + mid, pz + 2.5), 0.0));
            props.push(PropPosition::new(plan, PropType::Bench, at(px + mid, pz + 13.5), 180.0));
            props.push(PropPosition::new(plan, PropType::Bin, at(px + mid + 2.0, pz + 2.5), 0.0));
        }
        PlotKind::Landmark(_) => {
            props.push(PropPosition::new(plan, PropType::Bollard, at(11.5, 4.5), 0.0));
            props.push(PropPosition::new(plan, PropType::Bollard, at(16.5, 4.5), 0.0));
            props.push(PropPosition::new(plan, PropType::Bin, at(19.5, 5.5), 0.0));
        }
        PlotKind::Terrace { .. } | PlotKind::Flats { .. } | PlotKind::Wasteland => {
            if roll & 1 == 1 {
                props.push(PropPosition::new(plan, PropType::Bin, at(19.5, 5.5), 0.0));
            }
        }
    }

    if roll % 5 == 0 {
        props.push(PropPosition::new(plan, PropType::PhoneBox, at(4.5, 15.5), 0.0));
    }
    if (roll >> 8) % 7 == 1 {
        props.push(PropPosition::new(plan, PropType::BusShelter, at(22.6, 14.0), 90.0));
    }
    if (roll >> 16) % 6 == 2 {
        props.push(PropPosition::new(plan, PropType::Postbox, at(5.5, 20.5), 0.0));
    }

    props
}

/// Props whose centre lies in the chunk.
#[must_use]
pub fn props_for_chunk(plan: &TownPlan, coord: ChunkCoord) -> Vec<PropPosition> {
    let last = CHUNK_SIZE as i32 - 1;
    let min = CellCoord::from_block(coord.world_x(), coord.world_z());
    let max = CellCoord::from_block(coord.world_x() + last, coord.world_z() + last);

    let mut props = Vec::new();
    for cz in min.z..=max.z {
        for cx in min.x..=max.x {
            props.extend(
                props_for_cell(plan, CellCoord::new(cx, cz))
                    .into_iter()
                    .filter(|p| p.chunk() == coord),
            );
        }
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::WorldSeed;
    use crate::town::{ground_at, Ground};

    #[test]
    fn test_every_cell_has_a_lamppost_on_the_pavement() {
        let plan = TownPlan::new(WorldSeed::new(5));
        for x in -3..=3 {
            let props = props_for_cell(&plan, CellCoord::new(x, 2));
            let lamp = props.iter().find(|p| p.kind == PropType::Lamppost).unwrap();
            assert_eq!(
                ground_at(lamp.position[0].floor() as i32, lamp.position[2].floor() as i32),
                Ground::Pavement
            );
        }
    }

    #[test]
    fn test_prop_ids_are_stable_and_unique() {
        let plan = TownPlan::new(WorldSeed::new(5));
        let a = props_for_chunk(&plan, ChunkCoord::new(0, 0));
        let b = props_for_chunk(&plan, ChunkCoord::new(0, 0));
        assert_eq!(a, b);

        let mut ids: Vec<_> = (-2..=2)
            .flat_map(|x| props_for_cell(&plan, CellCoord::new(x, x)))
            .map(|p| p.id)
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_chunks_partition_props() {
        let plan = TownPlan::new(WorldSeed::new(11));
        let cell = CellCoord::new(0, 0);
        let in_cell = props_for_cell(&plan, cell).len();

        let mut found = 0;
        for cz in 0..2 {
            for cx in 0..2 {
                found += props_for_chunk(&plan, ChunkCoord::new(cx, cz))
                    .iter()
                    .filter(|p| CellCoord::from_block(p.position[0] as i32, p.position[2] as i32) == cell)
                    .count();
            }
        }
        assert_eq!(found, in_cell);
    }

    #[test]
    fn test_rotated_bus_shelter_box() {
        let plan = TownPlan::new(WorldSeed::new(1));
        let shelter = PropPosition::new(&plan, PropType::BusShelter, [10.0, 5.0, 10.0], 90.0);
        let aabb = shelter.aabb();
        assert!((aabb.max[0] - aabb.min[0] - 1.2).abs() < 1e-5);
        assert!((aabb.max[2] - aabb.min[2] - 3.0).abs() < 1e-5);
    }
}
