//! Armor framing, both standalone and around whole messages.

use saltpack_core::armor::{self, ArmorConfig, ArmorMarker};
use saltpack_core::encoding::{self, ALPHABET_BASE62};
use saltpack_core::{
    generate_sign_keypair, ErrorKind, InputParameters, MessageReader, MessageWriter,
    OutputParameters, ReaderKeys, Result, SignConfig, WordWrap,
};

fn signed_text(params: OutputParameters, body: &[u8]) -> String {
    let alice = generate_sign_keypair().unwrap();
    let mut out = Vec::new();
    let mut writer =
        MessageWriter::new(&mut out, params, SignConfig::attached(alice.secret_key()).into())
            .unwrap();
    writer.add_block(body, true).unwrap();
    drop(writer);
    String::from_utf8(out).unwrap()
}

fn verify(text: &str, params: InputParameters) -> Result<Vec<u8>> {
    let mut reader = MessageReader::new(text.as_bytes(), params, ReaderKeys::Verify)?;
    Ok(reader.blocks().collect::<Result<Vec<_>>>()?.concat())
}

#[test]
fn test_app_name_must_match_both_ways() {
    let with_app = signed_text(OutputParameters::armored().with_app("MYAPP"), b"hello");
    let without_app = signed_text(OutputParameters::armored(), b"hello");

    assert_eq!(
        verify(&with_app, InputParameters::armored().with_app("MYAPP")).unwrap(),
        b"hello"
    );
    for (text, params) in [
        (&with_app, InputParameters::armored()),
        (&with_app, InputParameters::armored().with_app("OTHER")),
        (&without_app, InputParameters::armored().with_app("MYAPP")),
    ] {
        assert_eq!(verify(text, params).unwrap_err().kind(), ErrorKind::FormatError);
    }
}

#[test]
fn test_custom_word_wrap() {
    let text = signed_text(OutputParameters::armored().with_word_wrap(5, 3), &[0xAB; 300]);
    let body_start = text.find(". ").unwrap() + 2;
    let body_end = text.rfind(". END").unwrap();
    let body = &text[body_start..body_end];

    for line in body.lines() {
        let words: Vec<&str> = line.split(' ').collect();
        assert!(words.len() <= 3);
        assert!(words.iter().all(|w| !w.is_empty() && w.len() <= 5));
    }
    assert!(body.lines().count() > 1);
    assert_eq!(verify(&text, InputParameters::armored()).unwrap(), vec![0xAB; 300]);
}

#[test]
fn test_rewrapped_body_still_reads() {
    let text = signed_text(OutputParameters::armored(), b"whitespace is not significant");
    let body_start = text.find(". ").unwrap() + 2;
    let body_end = text.rfind(". END").unwrap();
    let letters: String = text[body_start..body_end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut rewrapped = String::from(&text[..body_start]);
    for (i, c) in letters.chars().enumerate() {
        if i > 0 && i % 7 == 0 {
            rewrapped.push_str("\n> ");
        }
        rewrapped.push(c);
    }
    rewrapped.push_str(&text[body_end..]);

    assert_eq!(
        verify(&rewrapped, InputParameters::armored()).unwrap(),
        b"whitespace is not significant"
    );
}

#[test]
fn test_marker_must_match_mode() {
    let text = signed_text(OutputParameters::armored(), b"hello");
    let relabeled = text.replace("SIGNED MESSAGE", "ENCRYPTED MESSAGE");

    let err = verify(&relabeled, InputParameters::armored()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FormatError);
}

#[test]
fn test_footer_must_match_header() {
    let text = signed_text(OutputParameters::armored(), b"hello");
    let end = text.rfind("END SALTPACK SIGNED MESSAGE").unwrap();
    let broken = format!("{}END SALTPACK DETACHED SIGNATURE.", &text[..end]);

    let err = verify(&broken, InputParameters::armored()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FormatError);
}

#[test]
fn test_illegal_letter_in_body() {
    let text = signed_text(OutputParameters::armored(), b"hello");
    let body_start = text.find(". ").unwrap() + 2;
    let mut broken = text.clone();
    broken.replace_range(body_start..body_start + 1, "!");

    let err = verify(&broken, InputParameters::armored()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FormatError);
}

#[test]
fn test_invalid_output_parameters() {
    let alice = generate_sign_keypair().unwrap();
    for params in [
        OutputParameters::armored().with_app("TWO WORDS"),
        OutputParameters::armored().with_app(""),
        OutputParameters::armored().with_word_wrap(0, 10),
    ] {
        let err = MessageWriter::new(
            Vec::new(),
            params,
            SignConfig::attached(alice.secret_key()).into(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_one_shot_armor() {
    let payload: Vec<u8> = (0..100u8).collect();
    let config = ArmorConfig {
        app: Some("TOOL".into()),
        word_wrap: WordWrap::new(10, 4).unwrap(),
    };
    let text = armor::encode(&payload, ArmorMarker::DetachedSignature, &config).unwrap();

    let (marker, decoded) = armor::decode(&text, Some("TOOL")).unwrap();
    assert_eq!(marker, ArmorMarker::DetachedSignature);
    assert_eq!(decoded, payload);
}

#[test]
fn test_body_is_base62_blocks() {
    let payload = [0x5Au8; 64];
    let text = armor::encode(&payload, ArmorMarker::SignedMessage, &ArmorConfig::default()).unwrap();
    let body_start = text.find(". ").unwrap() + 2;
    let body_end = text.rfind(". END").unwrap();
    let letters: String = text[body_start..body_end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    assert_eq!(letters.len(), encoding::block_size(ALPHABET_BASE62, 64).unwrap());
    assert_eq!(encoding::decode(&letters, ALPHABET_BASE62).unwrap(), payload);
}
