//! Target entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::Target;

/// Database row mapping for the targets table.
#[derive(Debug, Clone, FromRow)]
pub struct TargetEntity {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: i32,
    pub is_active: bool,
    pub last_triggered: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TargetEntity> for Target {
    fn from(entity: TargetEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            latitude: entity.latitude,
            longitude: entity.longitude,
            radius_meters: entity.radius_meters,
            is_active: entity.is_active,
            last_triggered: entity.last_triggered,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_entity_to_domain() {
        let entity = TargetEntity {
            id: Uuid::new_v4(),
            name: "Trailhead".to_string(),
            latitude: 46.5197,
            longitude: 6.6323,
            radius_meters: 150,
            is_active: false,
            last_triggered: 1_700_000_000_000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let target: Target = entity.clone().into();

        assert_eq!(target.id, entity.id);
        assert_eq!(target.name, "Trailhead");
        assert_eq!(target.center(), (46.5197, 6.6323));
        assert_eq!(target.radius_meters, 150);
        assert!(!target.is_active);
        assert!(target.has_triggered());
    }
}
