use crate::{models, Error, NewAgreement, NewClaim, NewClient, Store};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::{env, time::Duration};

// These tests exercise a real database; point DATABASE_URL at a PostgreSQL
// instance with the migrations applied and run them with `--ignored`.

pub async fn create_store() -> Store {
    dotenv().ok();
    let config = crate::Config {
        db_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_open: 4,
        max_idle: 2,
        max_lifetime: None,
        max_idle_lifetime: None,
        timeout_for_get: Duration::from_secs(5),
    };
    let store = crate::create(&config)
        .await
        .expect("should connect to the test database");
    store
        .ensure_roles()
        .await
        .expect("should ensure the admin and client roles");
    store
}

/// Removes any leftovers of a prior run for the given client e-mail,
/// events first so the restrict rule cannot block the person deletion.
async fn purge_client(store: &Store, email: &str) {
    if let Ok(Some((person, _))) = store.load_person_by_email(email).await {
        let events = store
            .events_for_person(person.id)
            .await
            .expect("should list leftover events");
        for event in events {
            store
                .delete_event(event.id)
                .await
                .expect("should delete leftover event");
        }
        store
            .delete_person_and_account(email)
            .await
            .expect("should delete leftover client");
    }
}

async fn purge_products(store: &Store, object: &str) {
    let products = store
        .list_insurances(Some(object))
        .await
        .expect("should list leftover products");
    for product in products {
        store
            .delete_insurance(product.id)
            .await
            .expect("should delete leftover product");
    }
}

async fn seed_client(store: &Store, email: &str) -> (models::Account, models::InsuredPerson) {
    store
        .create_client_account(NewClient {
            first_name: "Jan".to_owned(),
            last_name: "Novak".to_owned(),
            address: "Main Street 1".to_owned(),
            date_of_birth: jiff::civil::date(1990, 4, 12),
            email: email.to_owned(),
            pass_phrase: "not-a-real-hash".to_owned(),
        })
        .await
        .expect("should create the client account")
}

async fn seed_product(store: &Store, object: &str) -> models::Insurance {
    store
        .create_insurance(crate::InsuranceFields {
            insured_object: object.to_owned(),
            description: "Collision".to_owned(),
            annual_payment: Decimal::from(5_000),
        })
        .await
        .expect("should create the product")
}

async fn seed_agreement(
    store: &Store,
    product: &models::Insurance,
    person: &models::InsuredPerson,
) -> models::AgreedInsurance {
    store
        .create_agreement(NewAgreement {
            insurance_id: product.id,
            insured_person_id: person.id,
            establishment_date: jiff::civil::date(2026, 1, 15),
            valid_to: jiff::civil::date(2027, 1, 15),
        })
        .await
        .expect("should create the contract")
}

#[tokio::test]
#[ignore = "needs a provisioned database"]
async fn duplicate_contract_for_same_product_and_person_is_rejected() {
    let store = create_store().await;
    let email = "dup-contract@polis.test";
    purge_client(&store, email).await;
    purge_products(&store, "DupContractCar").await;

    let (_, person) = seed_client(&store, email).await;
    let product = seed_product(&store, "DupContractCar").await;
    seed_agreement(&store, &product, &person).await;

    let second = store
        .create_agreement(NewAgreement {
            insurance_id: product.id,
            insured_person_id: person.id,
            establishment_date: jiff::civil::date(2026, 2, 1),
            valid_to: jiff::civil::date(2027, 2, 1),
        })
        .await;
    assert!(
        matches!(second, Err(Error::AlreadyAgreed)),
        "the second contract for the same pair should be rejected"
    );

    let contracts = store
        .agreements_for_person(person.id)
        .await
        .expect("should list the person's contracts");
    assert_eq!(contracts.len(), 1, "exactly one contract should remain");

    purge_client(&store, email).await;
    purge_products(&store, "DupContractCar").await;
}

#[tokio::test]
#[ignore = "needs a provisioned database"]
async fn deleting_a_product_cascades_to_its_contracts() {
    let store = create_store().await;
    let email = "cascade-product@polis.test";
    purge_client(&store, email).await;
    purge_products(&store, "CascadeHouse").await;

    let (_, person) = seed_client(&store, email).await;
    let product = seed_product(&store, "CascadeHouse").await;
    seed_agreement(&store, &product, &person).await;

    let removed = store
        .delete_insurance(product.id)
        .await
        .expect("a product without events should delete cleanly");
    assert_eq!(removed.map(|p| p.id), Some(product.id));

    let contracts = store
        .agreements_for_person(person.id)
        .await
        .expect("should list the person's contracts");
    assert!(contracts.is_empty(), "the contract should cascade away");

    purge_client(&store, email).await;
}

#[tokio::test]
#[ignore = "needs a provisioned database"]
async fn events_block_person_and_product_deletion() {
    let store = create_store().await;
    let email = "restrict-person@polis.test";
    purge_client(&store, email).await;
    purge_products(&store, "RestrictBoat").await;

    let (_, person) = seed_client(&store, email).await;
    let product = seed_product(&store, "RestrictBoat").await;
    let contract = seed_agreement(&store, &product, &person).await;
    store
        .create_event(NewClaim {
            description: "Hull damage".to_owned(),
            amount_of_damage: Decimal::from(2_500),
            occurred_on: jiff::civil::date(2026, 3, 3),
            agreed_insurance_id: contract.id,
            insured_person_id: person.id,
            insurance_id: product.id,
        })
        .await
        .expect("should record the claim");

    let person_delete = store.delete_person_and_account(email).await;
    assert!(
        matches!(person_delete, Err(Error::Blocked)),
        "a person with events should not be deletable"
    );
    let product_delete = store.delete_insurance(product.id).await;
    assert!(
        matches!(product_delete, Err(Error::Blocked)),
        "a product with events should not be deletable"
    );

    // The blocked transaction must not have half-applied: person, account
    // and the event are all still there.
    let reloaded = store
        .load_person_by_email(email)
        .await
        .expect("should reload the person");
    assert!(reloaded.is_some(), "person and account should survive");
    let events = store
        .events_for_person(person.id)
        .await
        .expect("should list the person's events");
    assert_eq!(events.len(), 1, "the event should survive");

    purge_client(&store, email).await;
    purge_products(&store, "RestrictBoat").await;
}

#[tokio::test]
#[ignore = "needs a provisioned database"]
async fn deleting_a_person_removes_account_and_contracts_together() {
    let store = create_store().await;
    let email = "cascade-person@polis.test";
    purge_client(&store, email).await;
    purge_products(&store, "CascadeBike").await;

    let (account, person) = seed_client(&store, email).await;
    let product = seed_product(&store, "CascadeBike").await;
    seed_agreement(&store, &product, &person).await;

    let removed = store
        .delete_person_and_account(email)
        .await
        .expect("a person without events should delete cleanly");
    assert_eq!(removed.map(|p| p.id), Some(person.id));

    assert!(store
        .load_account_by_id(account.id)
        .await
        .expect("should look up the account")
        .is_none());
    let contracts = store
        .agreements_for_person(person.id)
        .await
        .expect("should list the person's contracts");
    assert!(contracts.is_empty(), "contracts should cascade away");

    purge_products(&store, "CascadeBike").await;
}

#[tokio::test]
#[ignore = "needs a provisioned database"]
async fn a_taken_email_rejects_the_whole_client_creation() {
    let store = create_store().await;
    let email = "taken-email@polis.test";
    purge_client(&store, email).await;

    seed_client(&store, email).await;
    let second = store
        .create_client_account(NewClient {
            first_name: "Petr".to_owned(),
            last_name: "Svoboda".to_owned(),
            address: "Side Street 2".to_owned(),
            date_of_birth: jiff::civil::date(1985, 9, 1),
            email: email.to_uppercase(),
            pass_phrase: "not-a-real-hash".to_owned(),
        })
        .await;
    assert!(
        matches!(second, Err(Error::EmailTaken)),
        "the e-mail comparison should ignore case"
    );

    let persons = store
        .list_persons(Some("Svoboda"))
        .await
        .expect("should list persons");
    assert!(
        persons.is_empty(),
        "no person row should exist for the rejected creation"
    );

    purge_client(&store, email).await;
}

#[tokio::test]
#[ignore = "needs a provisioned database"]
async fn products_list_filters_and_orders_by_insured_object() {
    let store = create_store().await;
    purge_products(&store, "OrderedZebra").await;
    purge_products(&store, "OrderedAardvark").await;

    seed_product(&store, "OrderedZebra").await;
    seed_product(&store, "OrderedAardvark").await;

    let listed = store
        .list_insurances(Some("Ordered"))
        .await
        .expect("should list the products");
    let objects = listed
        .iter()
        .map(|p| p.insured_object.as_str())
        .collect::<Vec<_>>();
    assert_eq!(objects, ["OrderedAardvark", "OrderedZebra"]);

    purge_products(&store, "Ordered").await;
}
