use serde::{Deserialize, Serialize};

use stockroute_core::{DomainError, DomainResult, Entity, UserId, ValueObject, WarehouseId};

const MAX_NAME_LEN: usize = 100;

/// Contact details published for a warehouse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ValueObject for ContactInfo {}

/// Input for creating or updating a warehouse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewWarehouse {
    pub name: String,
    pub location: String,
    /// `None` means "0" on create and "unchanged" on update.
    pub capacity: Option<u64>,
    pub manager_id: Option<UserId>,
    pub contact: ContactInfo,
}

impl NewWarehouse {
    fn validated_name(&self) -> DomainResult<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "warehouse name cannot exceed {MAX_NAME_LEN} characters"
            )));
        }
        Ok(name.to_string())
    }

    fn validated_location(&self) -> DomainResult<String> {
        let location = self.location.trim();
        if location.is_empty() {
            return Err(DomainError::validation("warehouse location cannot be empty"));
        }
        Ok(location.to_string())
    }
}

/// A storage site.
///
/// Warehouses are never hard-deleted; `active == false` is the soft-delete
/// marker. `manager_id` is a weak reference: the user may disappear without
/// the warehouse noticing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub location: String,
    pub capacity: u64,
    pub manager_id: Option<UserId>,
    pub active: bool,
    pub contact: ContactInfo,
}

impl Warehouse {
    pub fn create(input: NewWarehouse) -> DomainResult<Self> {
        let name = input.validated_name()?;
        let location = input.validated_location()?;
        Ok(Self {
            id: WarehouseId::new(),
            name,
            location,
            capacity: input.capacity.unwrap_or(0),
            manager_id: input.manager_id,
            active: true,
            contact: input.contact,
        })
    }

    pub fn apply_update(&mut self, input: NewWarehouse) -> DomainResult<()> {
        self.name = input.validated_name()?;
        self.location = input.validated_location()?;
        if let Some(capacity) = input.capacity {
            self.capacity = capacity;
        }
        self.manager_id = input.manager_id;
        self.contact = input.contact;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewWarehouse {
        NewWarehouse {
            name: "North DC".to_string(),
            location: "Leeds".to_string(),
            capacity: None,
            manager_id: None,
            contact: ContactInfo::default(),
        }
    }

    #[test]
    fn create_defaults_capacity_to_zero_and_is_active() {
        let wh = Warehouse::create(input()).unwrap();
        assert_eq!(wh.capacity, 0);
        assert!(wh.active);
    }

    #[test]
    fn update_keeps_capacity_when_omitted() {
        let mut wh = Warehouse::create(NewWarehouse {
            capacity: Some(5_000),
            ..input()
        })
        .unwrap();

        wh.apply_update(NewWarehouse {
            name: "North DC (annex)".to_string(),
            ..input()
        })
        .unwrap();

        assert_eq!(wh.capacity, 5_000);
        assert_eq!(wh.name, "North DC (annex)");
    }

    #[test]
    fn blank_location_is_rejected() {
        let err = Warehouse::create(NewWarehouse {
            location: " ".to_string(),
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn name_limit_counts_characters_not_bytes() {
        let wh = Warehouse::create(NewWarehouse {
            name: "é".repeat(MAX_NAME_LEN),
            ..input()
        })
        .unwrap();
        assert_eq!(wh.name.chars().count(), MAX_NAME_LEN);

        let err = Warehouse::create(NewWarehouse {
            name: "é".repeat(MAX_NAME_LEN + 1),
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
