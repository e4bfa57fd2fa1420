//! # Signing Demo
//!
//! Attached and detached signatures, plus signcryption to a mix of a
//! public-key recipient and a shared-key recipient.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example signing_demo
//! ```

use saltpack_core::{
    generate_keypair, generate_random_bytes, generate_sign_keypair, InputParameters,
    MessageReader, MessageWriter, OutputParameters, ReaderKeys, RecipientEntry, SignConfig,
    SigncryptConfig,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saltpack_core=info".into()),
        )
        .init();

    println!("=== Saltpack Core: Signing Demo ===\n");

    let alice = generate_sign_keypair().expect("Failed to create Alice's signing key");
    println!("Alice's signing key: {}...\n", hex::encode(&alice.public_key()[..8]));

    // Attached
    println!("Step 1: Attached signature...");

    let mut signed = Vec::new();
    let mut writer = MessageWriter::new(
        &mut signed,
        OutputParameters::armored().with_app("DEMO"),
        SignConfig::attached(alice.secret_key()).into(),
    )
    .expect("Failed to start signing");
    writer.add_block(b"I owe Bob ", false).expect("Block failed");
    writer.add_block(b"five dollars.", true).expect("Block failed");
    drop(writer);

    let text = String::from_utf8(signed).expect("Armor is ASCII");
    println!("{}\n", text);

    let mut reader = MessageReader::new(
        text.as_bytes(),
        InputParameters::armored().with_app("DEMO"),
        ReaderKeys::Verify,
    )
    .expect("Failed to open the signed message");
    let body: Vec<u8> = reader
        .blocks()
        .collect::<Result<Vec<_>, _>>()
        .expect("Signature did not verify")
        .concat();
    println!("  Verified: \"{}\"", String::from_utf8_lossy(&body));
    println!();

    // Detached
    println!("Step 2: Detached signature...");

    let document = b"Quarterly report, final draft.";
    let mut signature = Vec::new();
    let mut writer = MessageWriter::new(
        &mut signature,
        OutputParameters::binary(),
        SignConfig::detached(alice.secret_key()).into(),
    )
    .expect("Failed to start signing");
    writer.add_block(document, true).expect("Block failed");
    drop(writer);

    println!("  Signature: {} bytes", signature.len());
    match MessageReader::with_detached_message(&signature[..], InputParameters::binary(), &document[..]) {
        Ok(r) => println!("  [OK] Signed by {}...", hex::encode(&r.sender()[..8])),
        Err(e) => println!("  [FAILED] {}", e),
    }
    match MessageReader::with_detached_message(
        &signature[..],
        InputParameters::binary(),
        &b"Quarterly report, final draft!"[..],
    ) {
        Ok(_) => println!("  [FAILED] Altered document accepted!"),
        Err(_) => println!("  [OK] Altered document rejected"),
    }
    println!();

    // Signcryption
    println!("Step 3: Signcryption to Bob and to a shared team key...");

    let bob = generate_keypair().expect("Failed to create Bob's keypair");
    let team_key = generate_random_bytes(32).expect("No randomness");

    let config = SigncryptConfig::new(
        Some(alice.secret_key()),
        vec![
            RecipientEntry::PublicKey(bob.public_key().to_vec()),
            RecipientEntry::Symmetric {
                identifier: b"team".to_vec(),
                key: team_key.clone(),
            },
        ],
    );
    let mut sealed = Vec::new();
    let mut writer = MessageWriter::new(&mut sealed, OutputParameters::binary(), config.into())
        .expect("Failed to start signcryption");
    writer.add_block(b"Meet at noon.", true).expect("Block failed");
    drop(writer);

    let mut reader = MessageReader::new(
        &sealed[..],
        InputParameters::binary(),
        ReaderKeys::symmetric(b"team", &team_key),
    )
    .expect("Team key did not open the message");
    let body = reader.get_block().expect("Block failed to verify");
    println!("  Team reads: \"{}\"", String::from_utf8_lossy(&body));
    if reader.sender() == alice.public_key() {
        println!("  [OK] Signed by Alice");
    } else {
        println!("  [FAILED] Unexpected sender");
    }
    println!();

    println!("=== Example Complete ===");
}
