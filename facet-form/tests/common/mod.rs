#![allow(dead_code)]

use facet::Facet;
use facet_form::InMemoryStore;
use uuid::Uuid;

#[derive(Facet, Debug, Default, Clone, PartialEq)]
#[facet(rename_all = "PascalCase")]
pub struct Employee {
    pub id: u32,
    pub name: String,
    pub manager: Option<Box<Employee>>,
    pub reports: Vec<Employee>,
    pub territories: Vec<Territory>,
}

#[derive(Facet, Debug, Default, Clone, PartialEq)]
#[facet(rename_all = "PascalCase")]
pub struct Territory {
    pub id: Uuid,
    pub name: String,
}

pub fn employee(id: u32, name: &str) -> Employee {
    Employee {
        id,
        name: name.to_string(),
        ..Default::default()
    }
}

pub const NORTH: Uuid = Uuid::from_u128(0x6f9619ff_8b86_d011_b42d_00c04fc964ff);

/// Pam (3), Jim (4), Tobias (12) and the North territory.
pub fn store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    store.insert(&employee(3, "Pam")).unwrap();
    store.insert(&employee(4, "Jim")).unwrap();
    store.insert(&employee(12, "Tobias")).unwrap();
    store
        .insert(&Territory {
            id: NORTH,
            name: "North".to_string(),
        })
        .unwrap();
    store
}
