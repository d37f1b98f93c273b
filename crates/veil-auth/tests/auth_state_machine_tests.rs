//! Integration tests for prompt transitions against real crypt(3) hashes.

use veil_auth::{
    AuthError, AuthStateMachine, CredentialHash, KeyOutcome, PasswordVerifier, SystemCryptVerifier,
    hash_password,
};
use veil_core::VisualState;
use veil_core::keysym::{XK_BACKSPACE, XK_ESCAPE, XK_KP_ENTER, XK_RETURN};

fn type_text<V: PasswordVerifier>(machine: &mut AuthStateMachine<V>, text: &str) {
    for ch in text.chars() {
        machine.handle_key(u32::from(ch));
    }
}

struct BrokenVerifier;

impl PasswordVerifier for BrokenVerifier {
    fn verify(&self, _candidate: &[u8], _hash: &CredentialHash) -> Result<bool, AuthError> {
        Err(AuthError::MalformedHash("simulated primitive failure"))
    }
}

#[test]
fn auth_state_machine_tests_verify_is_consistent() {
    for hash in [
        hash_password(b"plaintext", "$6$abc").expect("hash should compute"),
        hash_password(b"plaintext", "$5$rounds=2000$abc").expect("hash should compute"),
        hash_password(b"plaintext", "$y$j9T$F5Jx5fExrKuPp53xLKQ..1").expect("hash should compute"),
        hash_password(b"plaintext", "$2b$05$CCCCCCCCCCCCCCCCCCCCC.").expect("hash should compute"),
    ] {
        assert!(SystemCryptVerifier.verify(b"plaintext", &hash).expect("verify should run"));
        assert!(!SystemCryptVerifier.verify(b"plaintextx", &hash).expect("verify should run"));
    }
}

#[test]
fn auth_state_machine_tests_wrong_then_right_password() {
    let hash = hash_password(b"rightpass", "$6$abc").expect("hash should compute");
    let mut machine = AuthStateMachine::new(SystemCryptVerifier, hash);
    assert_eq!(machine.visual_state(), VisualState::Neutral);

    type_text(&mut machine, "wrongpass");
    assert_eq!(machine.visual_state(), VisualState::Typing);
    assert_eq!(machine.handle_key(XK_RETURN), KeyOutcome::Rejected);
    assert!(machine.buffer().is_wiped());
    assert_eq!(machine.visual_state(), VisualState::Rejected);

    type_text(&mut machine, "rightpass");
    assert_eq!(machine.visual_state(), VisualState::Typing);
    assert_eq!(machine.handle_key(XK_KP_ENTER), KeyOutcome::Accepted);
    assert!(machine.buffer().is_wiped());
}

#[test]
fn auth_state_machine_tests_cancel_wipes_and_returns_to_neutral() {
    let hash = hash_password(b"pw", "$6$abc").expect("hash should compute");
    let mut machine = AuthStateMachine::new(SystemCryptVerifier, hash);

    type_text(&mut machine, "partial");
    assert_eq!(machine.handle_key(XK_ESCAPE), KeyOutcome::Cleared);
    assert!(machine.buffer().is_wiped());
    assert_eq!(machine.visual_state(), VisualState::Neutral);
}

#[test]
fn auth_state_machine_tests_backspace_on_empty_is_noop() {
    let hash = hash_password(b"pw", "$6$abc").expect("hash should compute");
    let mut machine = AuthStateMachine::new(SystemCryptVerifier, hash);

    assert_eq!(machine.handle_key(XK_BACKSPACE), KeyOutcome::Ignored);
    assert_eq!(machine.buffer().len(), 0);
    assert_eq!(machine.visual_state(), VisualState::Neutral);
}

#[test]
fn auth_state_machine_tests_verifier_error_is_a_rejection() {
    let mut machine = AuthStateMachine::new(BrokenVerifier, CredentialHash::new("$6$abc$def"));

    type_text(&mut machine, "anything");
    assert_eq!(machine.handle_key(XK_RETURN), KeyOutcome::Rejected);
    assert!(machine.buffer().is_wiped());
    assert!(machine.is_rejected());
}

#[test]
fn auth_state_machine_tests_ignores_function_keys() {
    let hash = hash_password(b"pw", "$6$abc").expect("hash should compute");
    let mut machine = AuthStateMachine::new(SystemCryptVerifier, hash);

    // F1, Shift_L, Insert
    for keysym in [0xffbe, 0xffe1, 0xff63] {
        assert_eq!(machine.handle_key(keysym), KeyOutcome::Ignored);
    }
    assert_eq!(machine.buffer().len(), 0);
}
