use crate::coordinate::Coordinate;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Landmark {
    pub id: i64,
    pub name: String,
    pub position: Coordinate,
}

impl Landmark {
    pub fn new(id: i64, name: impl Into<String>, position: Coordinate) -> Self {
        Self {
            id,
            name: name.into(),
            position,
        }
    }
}
