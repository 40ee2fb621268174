use std::collections::BTreeSet;
use taxi_core::{
    Car, CarRepository, ConnectionProvider, Driver, DriverRepository, ErrorReason, EntityId,
    Manufacturer, ManufacturerRepository, Operation, SharedConnectionProvider, SqliteCarRepository,
    SqliteDriverRepository, SqliteManufacturerRepository,
};

struct Fixture {
    provider: SharedConnectionProvider,
}

impl Fixture {
    fn new() -> Self {
        Self {
            provider: SharedConnectionProvider::in_memory().unwrap(),
        }
    }

    fn cars(&self) -> SqliteCarRepository<&SharedConnectionProvider> {
        SqliteCarRepository::new(&self.provider)
    }

    fn manufacturer(&self, name: &str, country: &str) -> Manufacturer {
        SqliteManufacturerRepository::new(&self.provider)
            .create(Manufacturer::new(name, country))
            .unwrap()
    }

    fn driver(&self, name: &str, license_number: &str) -> Driver {
        SqliteDriverRepository::new(&self.provider)
            .create(Driver::new(name, license_number))
            .unwrap()
    }

    fn count(&self, sql: &str, id: EntityId) -> i64 {
        let conn = self.provider.get_connection().unwrap();
        conn.query_row(sql, [id], |row| row.get(0)).unwrap()
    }
}

fn driver_ids(car: &Car) -> BTreeSet<EntityId> {
    car.drivers.iter().filter_map(|driver| driver.id).collect()
}

#[test]
fn create_and_get_roundtrip_with_driver() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");

    let created = fx
        .cars()
        .create(Car::new("Model3", tesla.clone()).with_driver(alice.clone()))
        .unwrap();
    let id = created.id.expect("create must assign an id");

    let loaded = fx.cars().get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.model, "Model3");
    assert_eq!(loaded.manufacturer, tesla);
    assert_eq!(loaded.drivers, vec![alice]);
}

#[test]
fn create_with_many_drivers_returns_exact_driver_set() {
    let fx = Fixture::new();
    let toyota = fx.manufacturer("Toyota", "Japan");
    let drivers: Vec<Driver> = (0..4)
        .map(|i| fx.driver(&format!("Driver {i}"), &format!("LIC-{i}")))
        .collect();

    let mut car = Car::new("Prius", toyota);
    for driver in drivers.iter().rev() {
        car.add_driver(driver.clone());
    }
    let created = fx.cars().create(car).unwrap();

    let loaded = fx.cars().get_by_id(created.id.unwrap()).unwrap().unwrap();
    let expected: BTreeSet<_> = drivers.iter().filter_map(|driver| driver.id).collect();
    assert_eq!(driver_ids(&loaded), expected);
    assert_eq!(loaded.drivers.len(), 4);
}

#[test]
fn get_missing_car_returns_none() {
    let fx = Fixture::new();
    assert!(fx.cars().get_by_id(404).unwrap().is_none());
}

#[test]
fn soft_delete_hides_car_but_keeps_rows() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");
    let kept = fx.cars().create(Car::new("ModelY", tesla.clone())).unwrap();
    let deleted = fx
        .cars()
        .create(Car::new("Model3", tesla).with_driver(alice))
        .unwrap();
    let deleted_id = deleted.id.unwrap();

    assert!(fx.cars().delete(deleted_id).unwrap());

    assert!(fx.cars().get_by_id(deleted_id).unwrap().is_none());
    let listed: Vec<_> = fx.cars().get_all().unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(listed, vec![kept.id]);

    assert_eq!(
        fx.count("SELECT COUNT(*) FROM cars WHERE id = ?1 AND is_deleted = 1;", deleted_id),
        1
    );
    assert_eq!(
        fx.count("SELECT COUNT(*) FROM cars_drivers WHERE car_id = ?1;", deleted_id),
        1
    );
}

#[test]
fn delete_reports_whether_row_was_affected() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let car = fx.cars().create(Car::new("Model3", tesla)).unwrap();
    let id = car.id.unwrap();

    assert!(!fx.cars().delete(id + 100).unwrap());
    assert!(fx.cars().delete(id).unwrap());
    assert!(!fx.cars().delete(id).unwrap());
}

#[test]
fn update_replaces_model_manufacturer_and_driver_set() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let bmw = fx.manufacturer("BMW", "Germany");
    let alice = fx.driver("Alice", "LIC-001");
    let bob = fx.driver("Bob", "LIC-002");
    let carol = fx.driver("Carol", "LIC-003");

    let mut car = fx
        .cars()
        .create(
            Car::new("Model3", tesla)
                .with_driver(alice)
                .with_driver(bob.clone()),
        )
        .unwrap();
    let id = car.id.unwrap();

    car.model = "i4".to_string();
    car.manufacturer = bmw.clone();
    car.drivers = vec![bob.clone(), carol.clone()];
    fx.cars().update(car).unwrap();

    let loaded = fx.cars().get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.model, "i4");
    assert_eq!(loaded.manufacturer, bmw);
    let expected: BTreeSet<_> = [bob.id.unwrap(), carol.id.unwrap()].into_iter().collect();
    assert_eq!(driver_ids(&loaded), expected);
    assert_eq!(
        fx.count("SELECT COUNT(*) FROM cars_drivers WHERE car_id = ?1;", id),
        2
    );
}

#[test]
fn update_to_empty_driver_set_removes_all_links() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");
    let mut car = fx
        .cars()
        .create(Car::new("Model3", tesla).with_driver(alice))
        .unwrap();
    let id = car.id.unwrap();

    car.drivers.clear();
    fx.cars().update(car).unwrap();

    assert!(fx.cars().get_by_id(id).unwrap().unwrap().drivers.is_empty());
    assert_eq!(
        fx.count("SELECT COUNT(*) FROM cars_drivers WHERE car_id = ?1;", id),
        0
    );
}

#[test]
fn update_of_deleted_car_keeps_row_but_replaces_links() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");
    let bob = fx.driver("Bob", "LIC-002");
    let mut car = fx
        .cars()
        .create(Car::new("Model3", tesla).with_driver(alice.clone()))
        .unwrap();
    let id = car.id.unwrap();
    assert!(fx.cars().delete(id).unwrap());

    car.model = "Cybertruck".to_string();
    car.drivers = vec![bob.clone()];
    fx.cars().update(car).unwrap();

    let conn = fx.provider.get_connection().unwrap();
    let (model, is_deleted): (String, i64) = conn
        .query_row(
            "SELECT model, is_deleted FROM cars WHERE id = ?1;",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    let mut stmt = conn
        .prepare("SELECT driver_id FROM cars_drivers WHERE car_id = ?1 ORDER BY driver_id;")
        .unwrap();
    let linked: Vec<EntityId> = stmt
        .query_map([id], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    drop(stmt);
    drop(conn);

    assert_eq!(model, "Model3");
    assert_eq!(is_deleted, 1);
    assert_eq!(linked, vec![bob.id.unwrap()]);
    assert!(fx.cars().get_by_id(id).unwrap().is_none());
}

#[test]
fn update_of_missing_car_without_drivers_writes_nothing() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let mut ghost = Car::new("Model3", tesla);
    ghost.id = Some(404);

    let returned = fx.cars().update(ghost.clone()).unwrap();
    assert_eq!(returned, ghost);
    assert_eq!(
        fx.count("SELECT COUNT(*) FROM cars WHERE id = ?1;", 404),
        0
    );
}

#[test]
fn update_rejects_deleted_manufacturer_and_keeps_stored_car() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let bmw = fx.manufacturer("BMW", "Germany");
    let alice = fx.driver("Alice", "LIC-001");
    let mut car = fx
        .cars()
        .create(Car::new("Model3", tesla.clone()).with_driver(alice.clone()))
        .unwrap();
    let id = car.id.unwrap();
    SqliteManufacturerRepository::new(&fx.provider)
        .delete(bmw.id.unwrap())
        .unwrap();

    car.model = "i4".to_string();
    car.manufacturer = bmw;
    car.drivers.clear();
    let err = fx.cars().update(car).unwrap_err();
    assert_eq!(err.reason(), ErrorReason::NotFound);
    assert_eq!(err.operation(), Operation::UpdateCar);

    let loaded = fx.cars().get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.model, "Model3");
    assert_eq!(loaded.manufacturer, tesla);
    assert_eq!(loaded.drivers, vec![alice]);
}

#[test]
fn unmappable_column_value_is_reported_as_invalid_data() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let id = {
        let conn = fx.provider.get_connection().unwrap();
        conn.execute(
            "INSERT INTO cars (model, manufacturer_id) VALUES (X'FF00', ?1);",
            [tesla.id.unwrap()],
        )
        .unwrap();
        conn.last_insert_rowid()
    };

    let err = fx.cars().get_by_id(id).unwrap_err();
    assert_eq!(err.reason(), ErrorReason::InvalidData);
    assert_eq!(err.operation(), Operation::GetCar);
    assert!(err.db_error().is_some());

    let err = fx.cars().get_all().unwrap_err();
    assert_eq!(err.reason(), ErrorReason::InvalidData);
}

#[test]
fn get_all_by_driver_excludes_deleted_and_unlinked_cars() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");
    let bob = fx.driver("Bob", "LIC-002");

    let shared = fx
        .cars()
        .create(
            Car::new("Model3", tesla.clone())
                .with_driver(alice.clone())
                .with_driver(bob.clone()),
        )
        .unwrap();
    let retired = fx
        .cars()
        .create(Car::new("Roadster", tesla.clone()).with_driver(alice.clone()))
        .unwrap();
    fx.cars()
        .create(Car::new("ModelS", tesla).with_driver(bob))
        .unwrap();
    fx.cars().delete(retired.id.unwrap()).unwrap();

    let cars = fx.cars().get_all_by_driver(alice.id.unwrap()).unwrap();
    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0].id, shared.id);
    assert_eq!(cars[0].drivers.len(), 2);
}

#[test]
fn get_all_by_driver_returns_car_once_for_duplicate_links() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");
    let car = fx
        .cars()
        .create(Car::new("Model3", tesla).with_driver(alice.clone()))
        .unwrap();
    let car_id = car.id.unwrap();
    let alice_id = alice.id.unwrap();
    {
        let conn = fx.provider.get_connection().unwrap();
        conn.execute(
            "INSERT INTO cars_drivers (car_id, driver_id) VALUES (?1, ?2);",
            [car_id, alice_id],
        )
        .unwrap();
    }

    let cars = fx.cars().get_all_by_driver(alice_id).unwrap();
    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0].drivers, vec![alice]);
}

#[test]
fn get_all_hydrates_drivers_per_car() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");
    let bob = fx.driver("Bob", "LIC-002");
    fx.cars()
        .create(Car::new("Model3", tesla.clone()).with_driver(alice.clone()))
        .unwrap();
    fx.cars()
        .create(Car::new("ModelS", tesla.clone()).with_driver(bob.clone()))
        .unwrap();
    fx.cars().create(Car::new("ModelX", tesla)).unwrap();

    let cars = fx.cars().get_all().unwrap();
    let summary: Vec<(&str, Vec<Driver>)> = cars
        .iter()
        .map(|car| (car.model.as_str(), car.drivers.clone()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Model3", vec![alice]),
            ("ModelS", vec![bob]),
            ("ModelX", vec![]),
        ]
    );
}

#[test]
fn create_rolls_back_when_link_insert_fails() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let ghost = Driver::with_id(9_999, "Ghost", "LIC-404");

    let err = fx
        .cars()
        .create(Car::new("Model3", tesla).with_driver(ghost))
        .unwrap_err();
    assert_eq!(err.reason(), ErrorReason::Storage);
    assert_eq!(err.operation(), Operation::InsertCarDrivers);

    let conn = fx.provider.get_connection().unwrap();
    let cars: i64 = conn
        .query_row("SELECT COUNT(*) FROM cars;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(cars, 0);
}

#[test]
fn update_keeps_previous_links_when_link_insert_fails() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    let alice = fx.driver("Alice", "LIC-001");
    let mut car = fx
        .cars()
        .create(Car::new("Model3", tesla).with_driver(alice.clone()))
        .unwrap();
    let id = car.id.unwrap();

    car.model = "ModelY".to_string();
    car.drivers = vec![Driver::with_id(9_999, "Ghost", "LIC-404")];
    let err = fx.cars().update(car).unwrap_err();
    assert_eq!(err.reason(), ErrorReason::Storage);

    let loaded = fx.cars().get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.model, "Model3");
    assert_eq!(loaded.drivers, vec![alice]);
}

#[test]
fn create_rejects_deleted_manufacturer() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");
    SqliteManufacturerRepository::new(&fx.provider)
        .delete(tesla.id.unwrap())
        .unwrap();

    let err = fx.cars().create(Car::new("Model3", tesla)).unwrap_err();
    assert_eq!(err.reason(), ErrorReason::NotFound);
    assert!(err.to_string().contains("manufacturer id"));
}

#[test]
fn write_paths_validate_before_sql() {
    let fx = Fixture::new();
    let tesla = fx.manufacturer("Tesla", "USA");

    let unsaved_manufacturer = Car::new("Model3", Manufacturer::new("Tesla", "USA"));
    let err = fx.cars().create(unsaved_manufacturer).unwrap_err();
    assert_eq!(err.reason(), ErrorReason::Validation);

    let mut already_saved = Car::new("Model3", tesla.clone());
    already_saved.id = Some(1);
    let err = fx.cars().create(already_saved).unwrap_err();
    assert_eq!(err.reason(), ErrorReason::Validation);

    let err = fx.cars().update(Car::new("Model3", tesla)).unwrap_err();
    assert_eq!(err.reason(), ErrorReason::Validation);
    assert_eq!(err.operation(), Operation::UpdateCar);
}
