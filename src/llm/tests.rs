use super::*;
use std::cell::Cell;
use std::rc::Rc;

struct Scripted {
    name: &'static str,
    reply: Option<&'static str>,
    calls: Rc<Cell<usize>>,
}

impl Scripted {
    fn boxed(
        name: &'static str,
        reply: Option<&'static str>,
    ) -> (Box<dyn TextCompletion>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let backend = Self {
            name,
            reply,
            calls: Rc::clone(&calls),
        };
        (Box::new(backend), calls)
    }
}

impl TextCompletion for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.reply.map(str::to_string).ok_or_else(|| ReviewError::ExternalService {
            service: self.name.to_string(),
            message: "quota exceeded".to_string(),
        })
    }
}

#[test]
fn first_success_short_circuits() {
    let (first, first_calls) = Scripted::boxed("first", Some("from first"));
    let (second, second_calls) = Scripted::boxed("second", Some("from second"));
    let chain = CompletionChain::new(vec![first, second]);

    assert_eq!(chain.complete("prompt").expect("should complete"), "from first");
    assert_eq!(first_calls.get(), 1);
    assert_eq!(second_calls.get(), 0);
}

#[test]
fn falls_back_in_order() {
    let (first, _) = Scripted::boxed("first", None);
    let (second, _) = Scripted::boxed("second", None);
    let (third, third_calls) = Scripted::boxed("third", Some("from third"));
    let chain = CompletionChain::new(vec![first, second, third]);

    assert_eq!(chain.complete("prompt").expect("should complete"), "from third");
    assert_eq!(third_calls.get(), 1);
}

#[test]
fn exhaustion_reports_every_failure() {
    let (first, _) = Scripted::boxed("first", None);
    let (second, _) = Scripted::boxed("second", None);
    let chain = CompletionChain::new(vec![first, second]);

    match chain.complete("prompt") {
        Err(ReviewError::Completion { failures }) => {
            assert_eq!(failures.len(), 2);
            assert!(failures[0].starts_with("first: "));
            assert!(failures[1].starts_with("second: "));
            assert!(failures[1].contains("quota exceeded"));
        }
        other => panic!("expected completion error, got {:?}", other),
    }
}

#[test]
fn empty_chain_fails() {
    let chain = CompletionChain::new(Vec::new());

    assert!(chain.is_empty());
    assert!(matches!(
        chain.complete("prompt"),
        Err(ReviewError::Completion { failures }) if failures == vec!["no backends configured".to_string()]
    ));
}

#[test]
fn default_configuration_orders_backends() {
    let chain = CompletionChain::from_config(&LlmConfig::default()).expect("should build");

    assert_eq!(chain.len(), 3);
    assert_eq!(chain.names(), vec!["Gemini", "Groq", "HuggingFace"]);
}
