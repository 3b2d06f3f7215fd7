use redactor::Sensitive;

#[derive(Sensitive)]
struct Login {
    user: String,
    #[sensitive]
    password: String,
    attempts: u32,
}

fn main() {
    let login = Login {
        user: "alice".into(),
        password: "hunter2".into(),
        attempts: 3,
    };
    let debug = format!("{login:?}");
    assert!(debug.contains("alice"));
    assert!(debug.contains("attempts: 3"));
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains(redactor::REDACTED_PLACEHOLDER));
}
