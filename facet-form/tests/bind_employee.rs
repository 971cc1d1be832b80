mod common;

use chrono::NaiveDate;
use common::{Employee, NORTH, Territory, employee, store};
use facet::Facet;
use facet_form::{Binder, BinderConfig, FlatValueSet, InMemoryStore, NoLookup, lookup};
use facet_testhelpers::test;
use facet_value::VObject;
use uuid::Uuid;

#[test]
fn binds_simple_properties() {
    let values = FlatValueSet::from_urlencoded("Employee.Id=1&Employee.Name=Michael+Scott");
    let binding = Binder::new(NoLookup)
        .bind::<Employee>("Employee", &values)
        .unwrap();

    assert!(binding.is_valid());
    assert_eq!(binding.value.id, 1);
    assert_eq!(binding.value.name, "Michael Scott");
    assert_eq!(binding.value.manager, None);
    assert!(binding.value.reports.is_empty());
}

#[test]
fn uuid_identity_binds_as_scalar_on_the_root() {
    let values = FlatValueSet::from_urlencoded(&format!(
        "Territory.Id={}&Territory.Name=North",
        NORTH.hyphenated()
    ));
    let territory = facet_form::bind::<Territory>("Territory", &values)
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(territory.id, NORTH);
    assert_eq!(territory.name, "North");
}

#[test]
fn empty_uuid_identity_binds_to_nil() {
    let binding =
        facet_form::from_str::<Territory>("Territory", "Territory.Id=&Territory.Name=Someplace%2C+USA")
            .unwrap();
    assert!(binding.is_valid());
    assert_eq!(binding.value.id, Uuid::nil());
    assert_eq!(binding.value.name, "Someplace, USA");
}

#[test]
fn empty_numeric_identity_is_left_unset() {
    let binding = facet_form::from_str::<Employee>("Employee", "Employee.Id=&Employee.Name=New")
        .unwrap();
    assert!(binding.is_valid());
    assert_eq!(binding.value.id, 0);
    assert_eq!(binding.value.name, "New");
}

#[test]
fn fresh_uuid_entity_without_identity_key_gets_nil() {
    let binding = facet_form::from_str::<Territory>("Territory", "Territory.Name=South").unwrap();
    assert!(binding.is_valid());
    assert_eq!(binding.value.id, Uuid::nil());
    assert_eq!(binding.value.name, "South");

    let binding = facet_form::from_str::<Employee>("Employee", "Employee.Territories[0].Name=South")
        .unwrap();
    assert!(binding.is_valid());
    assert_eq!(
        binding.value.territories,
        vec![Territory {
            id: Uuid::nil(),
            name: "South".to_string(),
        }]
    );
}

#[test]
fn nested_entity_with_empty_identity_is_built_fresh() {
    let binding = Binder::new(store())
        .bind::<Employee>(
            "Employee",
            &FlatValueSet::from_urlencoded("Employee.Manager.Id=&Employee.Manager.Name=Bob+Vance"),
        )
        .unwrap();
    assert!(binding.is_valid());
    let manager = binding.value.manager.unwrap();
    assert_eq!(manager.id, 0);
    assert_eq!(manager.name, "Bob Vance");

    let binding = Binder::new(store())
        .bind::<Employee>(
            "Employee",
            &FlatValueSet::from_urlencoded(
                "Employee.Territories[0].Id=&Employee.Territories[0].Name=Scranton",
            ),
        )
        .unwrap();
    assert!(binding.is_valid());
    assert_eq!(binding.value.territories.len(), 1);
    assert_eq!(binding.value.territories[0].id, Uuid::nil());
    assert_eq!(binding.value.territories[0].name, "Scranton");
}

#[test]
fn new_managers_bind_from_nested_keys() {
    let values = FlatValueSet::from_urlencoded(
        "Employee.Name=Pam\
         &Employee.Manager.Name=Michael\
         &Employee.Manager.Manager.Name=Jan\
         &Employee.Manager.Manager.Manager.Name=David",
    );
    let employee = facet_form::bind::<Employee>("Employee", &values)
        .unwrap()
        .into_result()
        .unwrap();

    let michael = employee.manager.unwrap();
    assert_eq!(michael.name, "Michael");
    let jan = michael.manager.unwrap();
    assert_eq!(jan.name, "Jan");
    let david = jan.manager.unwrap();
    assert_eq!(david.name, "David");
    assert_eq!(david.manager, None);
}

#[test]
fn manager_resolves_from_the_exact_key() {
    let lookup = lookup::from_fn(|shape, id| {
        assert_eq!(shape.type_identifier, "Employee");
        let mut record = VObject::new();
        record.insert("Id", id.clone());
        record.insert("Name", "Tobias");
        Some(record.into())
    });
    let values = FlatValueSet::from_urlencoded("Employee.Name=Toby&Employee.Manager=12");
    let binding = Binder::new(lookup)
        .bind::<Employee>("Employee", &values)
        .unwrap();

    assert!(binding.is_valid());
    let manager = binding.value.manager.unwrap();
    assert_eq!(manager.id, 12);
    assert_eq!(manager.name, "Tobias");
}

#[test]
fn resolved_manager_accepts_nested_overrides() {
    let values =
        FlatValueSet::from_urlencoded("Employee.Manager.Id=12&Employee.Manager.Name=Toby+Flenderson");
    let binding = Binder::new(store())
        .bind::<Employee>("Employee", &values)
        .unwrap();

    assert!(binding.is_valid());
    let manager = binding.value.manager.unwrap();
    assert_eq!(manager.id, 12);
    assert_eq!(manager.name, "Toby Flenderson");
}

#[test]
fn identity_wins_over_the_exact_key() {
    let values = FlatValueSet::from_urlencoded("Employee.Manager=3&Employee.Manager.Id=4");
    let binding = Binder::new(store())
        .bind::<Employee>("Employee", &values)
        .unwrap();
    assert_eq!(binding.value.manager.unwrap().name, "Jim");
}

#[test]
fn empty_prefix_reads_relative_keys() {
    let values = FlatValueSet::from_urlencoded("Id=7&Name=Dwight&Manager=12");
    let binding = Binder::new(store()).bind::<Employee>("", &values).unwrap();

    assert!(binding.is_valid());
    assert_eq!(binding.value.id, 7);
    assert_eq!(binding.value.name, "Dwight");
    assert_eq!(binding.value.manager.unwrap().name, "Tobias");
}

#[test]
fn keys_outside_the_prefix_are_ignored() {
    let values = FlatValueSet::from_urlencoded("Employee.Name=Kevin&Other.Name=Oscar&Name=Angela");
    let employee = facet_form::bind::<Employee>("Employee", &values)
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(employee.name, "Kevin");
}

#[test]
fn root_identity_resolves_when_configured() {
    let mut store = InMemoryStore::new();
    let mut stored = employee(5, "Stanley");
    stored.manager = Some(Box::new(employee(1, "Michael")));
    store.insert(&stored).unwrap();

    let binder = Binder::with_config(store, BinderConfig::default().with_resolve_root(true));
    let values = FlatValueSet::from_urlencoded("Employee.Id=5&Employee.Name=Stanley+Hudson");
    let binding = binder.bind::<Employee>("Employee", &values).unwrap();

    assert!(binding.is_valid());
    assert_eq!(binding.value.id, 5);
    assert_eq!(binding.value.name, "Stanley Hudson");
    assert_eq!(binding.value.manager.unwrap().name, "Michael");
}

#[test]
fn root_without_identity_binds_fresh_when_resolving() {
    let binder = Binder::with_config(store(), BinderConfig::default().with_resolve_root(true));
    let values = FlatValueSet::from_urlencoded("Employee.Name=Ryan");
    let binding = binder.bind::<Employee>("Employee", &values).unwrap();

    assert!(binding.is_valid());
    assert_eq!(binding.value, employee(0, "Ryan"));
}

#[test]
fn bind_onto_keeps_unsubmitted_properties() {
    let mut existing = employee(3, "Pam");
    existing.manager = Some(Box::new(employee(1, "Michael")));
    existing.reports = vec![employee(8, "Erin")];

    let values = FlatValueSet::from_urlencoded("Employee.Name=Pam+Halpert");
    let binding = Binder::new(NoLookup)
        .bind_onto("Employee", &values, &existing)
        .unwrap();

    assert!(binding.is_valid());
    assert_eq!(binding.value.id, 3);
    assert_eq!(binding.value.name, "Pam Halpert");
    assert_eq!(binding.value.manager, existing.manager);
    assert_eq!(binding.value.reports, existing.reports);
}

#[test]
fn bind_onto_replaces_a_manager_by_identity() {
    let mut existing = employee(3, "Pam");
    existing.manager = Some(Box::new(employee(1, "Michael")));

    let values = FlatValueSet::from_urlencoded("Employee.Manager.Id=4");
    let binding = Binder::new(store())
        .bind_onto("Employee", &values, &existing)
        .unwrap();

    assert!(binding.is_valid());
    assert_eq!(*binding.value.manager.unwrap(), employee(4, "Jim"));
}

#[test]
fn custom_identity_property_name() {
    #[derive(Facet, Debug, Default)]
    #[facet(rename_all = "PascalCase")]
    struct Branch {
        code: String,
        city: String,
    }

    #[derive(Facet, Debug, Default)]
    #[facet(rename_all = "PascalCase")]
    struct Desk {
        number: u32,
        branch: Option<Branch>,
    }

    let config = BinderConfig::default().with_identity_property("code");
    let mut store = InMemoryStore::with_config(config.clone());
    store
        .insert(&Branch {
            code: "SCR".to_string(),
            city: "Scranton".to_string(),
        })
        .unwrap();

    let values = FlatValueSet::from_urlencoded("Desk.Number=4&Desk.Branch.Code=SCR");
    let desk = Binder::with_config(store, config)
        .bind::<Desk>("Desk", &values)
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(desk.number, 4);
    assert_eq!(desk.branch.unwrap().city, "Scranton");
}

#[test]
fn identity_attribute_marks_the_identity_field() {
    use facet_form as form;

    #[derive(Facet, Debug, Default)]
    struct Account {
        #[facet(form::id)]
        number: u64,
        owner: String,
    }

    #[derive(Facet, Debug, Default)]
    struct Transfer {
        from: Option<Account>,
        to: Option<Account>,
        amount: u32,
    }

    let mut store = InMemoryStore::new();
    store
        .insert(&Account {
            number: 42,
            owner: "Oscar".to_string(),
        })
        .unwrap();

    let values = FlatValueSet::from_urlencoded("from=42&to.owner=Kevin&amount=10");
    let transfer = Binder::new(store)
        .bind::<Transfer>("", &values)
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(transfer.from.unwrap().owner, "Oscar");
    let to = transfer.to.unwrap();
    assert_eq!(to.number, 0);
    assert_eq!(to.owner, "Kevin");
    assert_eq!(transfer.amount, 10);
}

#[test]
fn components_bind_from_nested_keys() {
    #[derive(Facet, Debug, Default, PartialEq)]
    #[facet(rename_all = "PascalCase")]
    struct Address {
        street: String,
        city: String,
    }

    #[derive(Facet, Debug, Default)]
    #[facet(rename_all = "PascalCase")]
    struct Customer {
        name: String,
        billing: Address,
        shipping: Option<Address>,
    }

    let values =
        FlatValueSet::from_urlencoded("Customer.Name=Dunder&Customer.Billing.City=Scranton");
    let customer = facet_form::bind::<Customer>("Customer", &values)
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(
        customer.billing,
        Address {
            street: String::new(),
            city: "Scranton".to_string(),
        }
    );
    assert_eq!(customer.shipping, None);
}

#[test]
fn scalar_kinds_convert() {
    #[derive(Facet, Debug, Default, PartialEq)]
    #[repr(u8)]
    enum Shift {
        #[default]
        Day,
        Night,
    }

    #[derive(Facet, Debug, Default)]
    #[facet(rename_all = "PascalCase")]
    struct Timesheet {
        hired_on: NaiveDate,
        shift: Shift,
        overtime: bool,
        remote: bool,
        rate: Option<f64>,
        initial: char,
    }

    let values = FlatValueSet::from_urlencoded(
        "HiredOn=2005-03-24&Shift=Night&Overtime=on&Remote=False&Rate=&Initial=D",
    );
    let sheet = facet_form::bind::<Timesheet>("", &values)
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(sheet.hired_on, NaiveDate::from_ymd_opt(2005, 3, 24).unwrap());
    assert_eq!(sheet.shift, Shift::Night);
    assert!(sheet.overtime);
    assert!(!sheet.remote);
    assert_eq!(sheet.rate, None);
    assert_eq!(sheet.initial, 'D');
}
