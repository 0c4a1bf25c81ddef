//! Static map data: obstacle polygons loaded once at startup.

use crate::math::Vector2;
use serde::{Deserialize, Serialize};

/// Visual tag for an obstacle. Opaque to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStyle {
    StoneWall,
    WoodenBarrier,
    Metal,
}

/// An immutable obstacle in world coordinates.
///
/// The polygon is an ordered vertex list with an implicit closing edge from
/// the last vertex back to the first. It is assumed to be simple (not
/// self-intersecting); collision results on non-simple polygons are
/// unspecified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticObject {
    pub id: String,
    pub polygon: Vec<Vector2>,
    pub render_style: RenderStyle,
}

impl StaticObject {
    pub fn new(id: &str, polygon: &[(f32, f32)], render_style: RenderStyle) -> Self {
        Self {
            id: id.to_string(),
            polygon: polygon.iter().map(|&(x, y)| Vector2::new(x, y)).collect(),
            render_style,
        }
    }
}

/// The built-in obstacle layout for the default 1600x900 world.
///
/// The middle of the world is kept clear so that jittered spawns around the
/// center never start inside an obstacle.
pub fn default_obstacles() -> Vec<StaticObject> {
    vec![
        StaticObject::new(
            "north-wall",
            &[(300.0, 150.0), (700.0, 150.0), (700.0, 190.0), (300.0, 190.0)],
            RenderStyle::StoneWall,
        ),
        StaticObject::new(
            "east-barrier",
            &[(1200.0, 250.0), (1240.0, 250.0), (1240.0, 650.0), (1200.0, 650.0)],
            RenderStyle::WoodenBarrier,
        ),
        StaticObject::new(
            "south-west-block",
            &[(350.0, 600.0), (550.0, 600.0), (450.0, 760.0)],
            RenderStyle::Metal,
        ),
        // L-shaped, concave
        StaticObject::new(
            "south-east-ledge",
            &[
                (1000.0, 700.0),
                (1400.0, 700.0),
                (1400.0, 740.0),
                (1060.0, 740.0),
                (1060.0, 840.0),
                (1000.0, 840.0),
            ],
            RenderStyle::StoneWall,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WORLD_HEIGHT, WORLD_WIDTH};

    #[test]
    fn test_default_obstacles_inside_world() {
        for obstacle in default_obstacles() {
            assert!(obstacle.polygon.len() >= 3, "{} is degenerate", obstacle.id);
            for vertex in &obstacle.polygon {
                assert!((0.0..=WORLD_WIDTH).contains(&vertex.x));
                assert!((0.0..=WORLD_HEIGHT).contains(&vertex.y));
            }
        }
    }

    #[test]
    fn test_render_style_serialization() {
        let json = serde_json::to_string(&RenderStyle::WoodenBarrier).unwrap();
        assert_eq!(json, "\"wooden-barrier\"");
    }
}
