use std::marker::PhantomData;

use redactor::Sensitive;

struct NotDebug;

#[derive(Sensitive)]
struct Tagged<T, M>(&'static str, #[sensitive] T, PhantomData<M>);

fn main() {
    let tagged: Tagged<String, NotDebug> = Tagged("label", "secret".to_string(), PhantomData);
    let debug = format!("{tagged:?}");
    assert!(debug.starts_with("Tagged(\"label\""));
    assert!(!debug.contains("secret"));
}
