// End-to-end scenarios against a file-backed database

use rand::rngs::StdRng;
use rand::SeedableRng;
use simple_banking::{
    is_valid, AccountStore, BankError, BankingService, CardIssuer, Console, Session,
};
use tempfile::TempDir;

fn seeded_service(seed: u64) -> BankingService {
    BankingService::with_rng(CardIssuer::default(), Box::new(StdRng::seed_from_u64(seed)))
}

#[test]
fn test_full_account_lifecycle() {
    let dir = TempDir::new().unwrap();
    let mut store = AccountStore::open(dir.path().join("card.s3db")).unwrap();
    let mut service = seeded_service(2024);

    // Create N1 and fund it
    let first = service.create_account(&mut store).unwrap();
    service.login(&store, &first.number, &first.pin).unwrap();
    assert_eq!(service.balance(&store).unwrap(), 0);
    assert_eq!(service.add_income(&mut store, 100).unwrap(), 100);

    // Create N2 while N1 is logged in; session is untouched
    let second = service.create_account(&mut store).unwrap();
    assert_ne!(first.number, second.number);
    assert_eq!(service.active_number(), Some(first.number.as_str()));

    // Move everything to N2
    service.transfer(&mut store, &second.number, 100).unwrap();
    assert_eq!(service.balance(&store).unwrap(), 0);
    assert_eq!(
        store.find_by_number(&second.number).unwrap().unwrap().balance,
        100
    );

    // Close N1: session ends, record is gone, login fails generically
    service.close_account(&mut store).unwrap();
    assert_eq!(service.session(), &Session::LoggedOut);
    assert!(matches!(
        service.login(&store, &first.number, &first.pin),
        Err(BankError::AuthFailure)
    ));

    // N2 is unaffected
    service.login(&store, &second.number, &second.pin).unwrap();
    assert_eq!(service.balance(&store).unwrap(), 100);
}

#[test]
fn test_bad_checksum_login_looks_like_wrong_pin() {
    let mut store = AccountStore::open_in_memory().unwrap();
    let mut service = seeded_service(5);
    let creds = service.create_account(&mut store).unwrap();

    let mut tampered = creds.number.clone();
    let last = tampered.pop().unwrap().to_digit(10).unwrap();
    tampered.push(char::from_digit((last + 1) % 10, 10).unwrap());
    assert!(!is_valid(&tampered));

    let other_pin = if creds.pin == "0000" { "0001" } else { "0000" };

    let bad_number = service.login(&store, &tampered, &creds.pin).unwrap_err();
    let bad_pin = service.login(&store, &creds.number, other_pin).unwrap_err();

    assert!(matches!(bad_number, BankError::AuthFailure));
    assert!(matches!(bad_pin, BankError::AuthFailure));
    assert_eq!(bad_number.to_string(), bad_pin.to_string());
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("card.s3db");

    let creds = {
        let mut store = AccountStore::open(&path).unwrap();
        let mut service = seeded_service(77);
        let creds = service.create_account(&mut store).unwrap();
        service.login(&store, &creds.number, &creds.pin).unwrap();
        service.add_income(&mut store, 321).unwrap();
        creds
    };

    let store = AccountStore::open(&path).unwrap();
    let mut service = seeded_service(78);
    service.login(&store, &creds.number, &creds.pin).unwrap();
    assert_eq!(service.balance(&store).unwrap(), 321);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_console_transfer_session() {
    let dir = TempDir::new().unwrap();
    let mut store = AccountStore::open(dir.path().join("card.s3db")).unwrap();

    // Receiver created directly through the service
    let receiver = seeded_service(1).create_account(&mut store).unwrap();

    let sender = seeded_service(2).create_account(&mut store).unwrap();
    store.update_balance(&sender.number, 500).unwrap();

    let script = format!(
        "2\n{}\n{}\n3\n{}\n800\n3\n{}\n200\n1\n0\n",
        sender.number, sender.pin, receiver.number, receiver.number
    );

    let mut output = Vec::new();
    Console::new(&mut store, seeded_service(3), script.as_bytes(), &mut output)
        .run()
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    assert!(output.contains("Not enough money!"));
    assert!(output.contains("Success!"));
    assert!(output.contains("Balance: 300"));
    assert!(output.ends_with("\nBye!\n"));

    assert_eq!(store.find_by_number(&sender.number).unwrap().unwrap().balance, 300);
    assert_eq!(store.find_by_number(&receiver.number).unwrap().unwrap().balance, 200);
}
