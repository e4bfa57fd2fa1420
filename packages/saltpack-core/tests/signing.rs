//! Attached and detached signing through the public writer/reader API.

use saltpack_core::{
    generate_sign_keypair, ErrorKind, InputParameters, MessageReader, MessageWriter, Mode,
    OutputParameters, ReaderKeys, Result, SignConfig,
};

fn sign(config: SignConfig, params: OutputParameters, blocks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut writer = MessageWriter::new(&mut out, params, config.into()).unwrap();
    let last = blocks.len() - 1;
    for (i, block) in blocks.iter().enumerate() {
        writer.add_block(block, i == last).unwrap();
    }
    drop(writer);
    out
}

#[test]
fn test_attached_armored_with_app() {
    let alice = generate_sign_keypair().unwrap();
    let signed = sign(
        SignConfig::attached(alice.secret_key()),
        OutputParameters::armored().with_app("KEYBASE"),
        &[b"Signed ", b"and ", b"sealed."],
    );
    let text = String::from_utf8(signed).unwrap();
    assert!(text.starts_with("BEGIN KEYBASE SALTPACK SIGNED MESSAGE. "));

    let mut reader = MessageReader::new(
        text.as_bytes(),
        InputParameters::armored().with_app("KEYBASE"),
        ReaderKeys::Verify,
    )
    .unwrap();
    assert_eq!(reader.mode(), Mode::AttachedSigning);
    assert_eq!(reader.sender(), alice.public_key());
    assert!(reader.recipients().is_empty());
    assert!(!reader.is_intentionally_anonymous());

    let body = reader.blocks().collect::<Result<Vec<_>>>().unwrap().concat();
    assert_eq!(body, b"Signed and sealed.");
}

#[test]
fn test_attached_tampered_block_fails_at_that_block() {
    let alice = generate_sign_keypair().unwrap();
    let first = vec![b'a'; 1000];
    let mut wire = sign(
        SignConfig::attached(alice.secret_key()),
        OutputParameters::binary(),
        &[b"intact", &first, b"end"],
    );
    // Inside the second block's chunk; the last packet is well under 200 bytes
    let at = wire.len() - 200;
    wire[at] ^= 0x01;

    let mut reader =
        MessageReader::new(&wire[..], InputParameters::binary(), ReaderKeys::Verify).unwrap();
    assert_eq!(reader.get_block().unwrap(), b"intact");
    assert_eq!(reader.get_block().unwrap_err().kind(), ErrorKind::AuthenticationFailure);
}

#[test]
fn test_detached_verifies_original_only() {
    let alice = generate_sign_keypair().unwrap();
    let message = b"Sample message.";
    let signature = sign(
        SignConfig::detached(alice.secret_key()),
        OutputParameters::binary(),
        &[b"Sample", b" message", b"."],
    );

    let mut reader = MessageReader::with_detached_message(
        &signature[..],
        InputParameters::binary(),
        &message[..],
    )
    .unwrap();
    assert_eq!(reader.mode(), Mode::DetachedSigning);
    assert_eq!(reader.sender(), alice.public_key());
    assert!(!reader.has_more_blocks());
    assert_eq!(
        reader.get_block().unwrap_err().to_string(),
        "Format error: No more blocks available."
    );

    let err = MessageReader::with_detached_message(
        &signature[..],
        InputParameters::binary(),
        &b"Sample message.!"[..],
    )
    .err()
    .unwrap();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);

    let err = MessageReader::with_detached_message(
        &signature[..],
        InputParameters::binary(),
        &b"Sample messagE."[..],
    )
    .err()
    .unwrap();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
}

#[test]
fn test_detached_armored() {
    let alice = generate_sign_keypair().unwrap();
    let signature = sign(
        SignConfig::detached(alice.secret_key()),
        OutputParameters::armored(),
        &[b"document"],
    );
    let text = String::from_utf8(signature).unwrap();
    assert!(text.starts_with("BEGIN SALTPACK DETACHED SIGNATURE. "));
    assert!(text.ends_with(". END SALTPACK DETACHED SIGNATURE."));

    MessageReader::with_detached_message(text.as_bytes(), InputParameters::armored(), &b"document"[..])
        .unwrap();
}

#[test]
fn test_detached_needs_the_message() {
    let alice = generate_sign_keypair().unwrap();
    let signature = sign(
        SignConfig::detached(alice.secret_key()),
        OutputParameters::binary(),
        &[b"document"],
    );

    let err = MessageReader::new(&signature[..], InputParameters::binary(), ReaderKeys::Verify)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_attached_is_not_detached() {
    let alice = generate_sign_keypair().unwrap();
    let signed = sign(
        SignConfig::attached(alice.secret_key()),
        OutputParameters::binary(),
        &[b"document"],
    );

    let err = MessageReader::with_detached_message(
        &signed[..],
        InputParameters::binary(),
        &b"document"[..],
    )
    .err()
    .unwrap();
    assert_eq!(err.kind(), ErrorKind::FormatError);
}

#[test]
fn test_signatures_differ_for_same_content() {
    let alice = generate_sign_keypair().unwrap();
    let a = sign(SignConfig::attached(alice.secret_key()), OutputParameters::binary(), &[b"same"]);
    let b = sign(SignConfig::attached(alice.secret_key()), OutputParameters::binary(), &[b"same"]);
    assert_ne!(a, b);
}
