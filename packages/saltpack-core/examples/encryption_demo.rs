//! # Encryption Demo
//!
//! Encrypts a message to two recipients, armors it, then decrypts it as
//! one of them.
//!
//! ## Run
//!
//! ```bash
//! RUST_LOG=saltpack_core=debug cargo run --example encryption_demo
//! ```

use saltpack_core::{
    generate_keypair, EncryptConfig, InputParameters, MessageReader, MessageWriter,
    OutputParameters, ReaderKeys,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saltpack_core=info".into()),
        )
        .init();

    println!("=== Saltpack Core: Multi-Recipient Encryption Demo ===\n");

    // Step 1: Keys
    println!("Step 1: Creating keypairs for Alice, Bob and Carol...");

    let alice = generate_keypair().expect("Failed to create Alice's keypair");
    let bob = generate_keypair().expect("Failed to create Bob's keypair");
    let carol = generate_keypair().expect("Failed to create Carol's keypair");

    println!("  Alice (sender):    {}...", hex::encode(&alice.public_key()[..8]));
    println!("  Bob (recipient):   {}...", hex::encode(&bob.public_key()[..8]));
    println!("  Carol (recipient): {}...", hex::encode(&carol.public_key()[..8]));
    println!();

    // Step 2: Write
    println!("Step 2: Alice encrypts \"Sample message.\" in three blocks...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                      MESSAGE LAYOUT                         │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │   header   payload key boxed for Bob and for Carol          │");
    println!("  │   block 0  \"Sample\"                                         │");
    println!("  │   block 1  \" message\"                                       │");
    println!("  │   block 2  \".\"  (final)                                     │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let config = EncryptConfig::new(
        Some(alice.secret_key()),
        vec![bob.public_key().to_vec(), carol.public_key().to_vec()],
    );
    let mut armored = Vec::new();
    let mut writer = MessageWriter::new(&mut armored, OutputParameters::armored(), config.into())
        .expect("Failed to start the message");
    writer.add_block(b"Sample", false).expect("Block 0 failed");
    writer.add_block(b" message", false).expect("Block 1 failed");
    writer.add_block(b".", true).expect("Block 2 failed");
    drop(writer);

    let text = String::from_utf8(armored).expect("Armor is ASCII");
    println!("{}\n", text);

    // Step 3: Read
    println!("Step 3: Carol decrypts...");

    let mut reader = MessageReader::new(
        text.as_bytes(),
        InputParameters::armored(),
        ReaderKeys::decrypt(carol.secret_key()),
    )
    .expect("Failed to open the message");

    let mut plaintext = Vec::new();
    for block in reader.blocks() {
        plaintext.extend(block.expect("Block failed to verify"));
    }

    println!("  Decrypted: \"{}\"", String::from_utf8_lossy(&plaintext));
    println!("  Recipients listed: {}", reader.recipients().len());
    if reader.sender() == alice.public_key() {
        println!("  [OK] Sender is Alice");
    } else {
        println!("  [FAILED] Unexpected sender");
    }
    println!();

    // Step 4: Outsider
    println!("Step 4: An outsider tries to open it...");

    let mallory = generate_keypair().expect("Failed to create Mallory's keypair");
    match MessageReader::new(
        text.as_bytes(),
        InputParameters::armored(),
        ReaderKeys::decrypt(mallory.secret_key()),
    ) {
        Ok(_) => println!("  [FAILED] Outsider opened the message!"),
        Err(e) => println!("  [OK] Rejected: {}", e),
    }
    println!();

    println!("=== Example Complete ===");
}
