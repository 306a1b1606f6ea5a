//! Integration tests for the domain compiler and its catalog.

mod fixtures;

use std::panic::{AssertUnwindSafe, catch_unwind};

use common::{content_hash, content_hash32, make_versioned_command_type, make_versioned_event_type};
use domain::{
    Aggregate, CompileError, DomainDefinition, MessageDefinition, MessageGroup, Payload,
    domain_definition, must_compile,
};
use serde::{Deserialize, Serialize};

use fixtures::*;

mod shop {
    pub mod cart {
        pub mod v2 {
            use super::super::super::*;

            #[derive(Debug, Serialize, Deserialize)]
            pub struct AddLine {}

            impl MessageDefinition for AddLine {
                const DOMAIN_URI: &'static str = module_path!();
            }

            #[derive(Debug, Serialize, Deserialize)]
            pub struct LineAdded {}

            impl MessageDefinition for LineAdded {
                const DOMAIN_URI: &'static str = module_path!();
            }

            pub fn definition() -> DomainDefinition {
                domain_definition!()
                    .aggregate::<Value>()
                    .commands(MessageGroup::commands().message::<AddLine>())
                    .events(MessageGroup::events().message::<LineAdded>())
            }
        }
    }
}

mod compile {
    use super::*;

    #[test]
    fn test_valuechanger_compiles() {
        let domain = value_definition().compile().unwrap();

        assert_eq!(domain.uri(), VALUE_URI);
        assert_eq!(domain.name(), "valuechanger");
        assert_eq!(domain.version(), 1);
        assert_eq!(domain.id(), content_hash(VALUE_URI.as_bytes()));
        assert_eq!(domain.short_id(), content_hash32(VALUE_URI.as_bytes()));
        assert_eq!(domain.aggregate_type_name(), "Value");

        let names: Vec<&str> = domain
            .message_types()
            .all()
            .iter()
            .map(|m| m.canonical_name())
            .collect();
        assert_eq!(
            names,
            vec!["clearvalue_v1", "setvalue_v1", "valuecleared_v1", "valueset_v1"]
        );
    }

    #[test]
    fn test_message_type_ids_derive_from_canonical_name() {
        let domain = value_definition().compile().unwrap();
        let catalog = domain.message_types();

        let set = catalog.by_type::<SetValue>().unwrap();
        assert!(set.is_command());
        assert_eq!(set.id(), content_hash(b"setvalue_v1"));
        assert_eq!(
            set.message_type_id(),
            make_versioned_command_type(content_hash(b"setvalue_v1"), 1)
        );
        assert_eq!(set.domain_id(), domain.id());
        assert_eq!(set.display_name(), "SetValue");
        assert_eq!(set.lower_name(), "setvalue");

        let event = catalog.by_type::<ValueSet>().unwrap();
        assert!(!event.is_command());
        assert_eq!(
            event.message_type_id(),
            make_versioned_event_type(content_hash(b"valueset_v1"), 1)
        );
    }

    #[test]
    fn test_module_path_becomes_uri() {
        let domain = crate::shop::cart::v2::definition().compile().unwrap();
        assert_eq!(domain.name(), "cart");
        assert_eq!(domain.version(), 2);
        assert!(domain.uri().ends_with("/shop/cart/v2"));
        assert!(!domain.uri().contains("::"));
    }

    #[test]
    fn test_versions_come_from_suffix_or_tag() {
        let domain = DomainDefinition::new("x")
            .uri(VALUE_URI)
            .aggregate::<Value>()
            .commands(
                MessageGroup::commands()
                    .message::<SetValue_v3>()
                    .message_with_version::<SetValue>("2"),
            )
            .events(MessageGroup::events().message::<ValueSet>())
            .compile()
            .unwrap();

        let catalog = domain.message_types();
        let v3 = catalog.by_type::<SetValue_v3>().unwrap();
        assert_eq!(v3.version(), 3);
        assert_eq!(v3.canonical_name(), "setvalue_v3_v3");
        assert_eq!(v3.message_type_id().version(), 3);

        let v2 = catalog.by_type::<SetValue>().unwrap();
        assert_eq!(v2.version(), 2);
        assert_eq!(v2.canonical_name(), "setvalue_v2");
    }

    #[test]
    #[should_panic(expected = "aggregate not provided")]
    fn test_must_compile_panics_on_error() {
        must_compile(
            DomainDefinition::new(VALUE_URI)
                .commands(MessageGroup::commands().message::<SetValue>())
                .events(MessageGroup::events().message::<ValueSet>()),
        );
    }
}

mod invalid_definitions {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not serializable"))
        }
    }

    impl Aggregate for Unserializable {
        fn apply(&mut self, _: &dyn Payload) {}
    }

    fn commands() -> MessageGroup {
        MessageGroup::commands().message::<SetValue>()
    }

    fn events() -> MessageGroup {
        MessageGroup::events().message::<ValueSet>()
    }

    #[test]
    fn test_missing_aggregate() {
        let result = DomainDefinition::new(VALUE_URI)
            .commands(commands())
            .events(events())
            .compile();
        assert_eq!(result.unwrap_err(), CompileError::AggregateNotProvided);
    }

    #[test]
    fn test_unserializable_aggregate() {
        let result = DomainDefinition::new(VALUE_URI)
            .aggregate::<Unserializable>()
            .commands(commands())
            .events(events())
            .compile();
        assert!(matches!(result, Err(CompileError::InvalidAggregate(_))));
    }

    #[test]
    fn test_bad_uris() {
        for uri in ["github.com/valuechanger", "a/b/c", "a/b/1", "a/b/vX"] {
            let result = DomainDefinition::new(uri)
                .aggregate::<Value>()
                .commands(MessageGroup::commands())
                .events(MessageGroup::events())
                .compile();
            assert_eq!(
                result.unwrap_err(),
                CompileError::InvalidDomainUri(uri.to_string()),
                "{uri}"
            );
        }
    }

    #[test]
    fn test_missing_or_mistyped_groups() {
        let base = || DomainDefinition::new(VALUE_URI).aggregate::<Value>();

        let missing = base().events(events()).compile();
        assert_eq!(missing.unwrap_err(), CompileError::CommandsNotProvided);

        let empty = base().commands(MessageGroup::commands()).events(events()).compile();
        assert_eq!(empty.unwrap_err(), CompileError::CommandsNotProvided);

        let mistyped = base().commands(events()).events(events()).compile();
        assert_eq!(mistyped.unwrap_err(), CompileError::CommandsNotProvided);

        let no_events = base().commands(commands()).compile();
        assert_eq!(no_events.unwrap_err(), CompileError::EventsNotProvided);

        let mistyped = base().commands(commands()).events(commands()).compile();
        assert_eq!(mistyped.unwrap_err(), CompileError::EventsNotProvided);
    }

    #[test]
    fn test_message_from_another_domain() {
        let result = DomainDefinition::new(VALUE_URI)
            .aggregate::<Value>()
            .commands(commands().message::<Foreign>())
            .events(events())
            .compile();
        assert!(matches!(result, Err(CompileError::InvalidMessage(_))));
    }

    #[test]
    fn test_unparsable_version_tag() {
        let result = DomainDefinition::new(VALUE_URI)
            .aggregate::<Value>()
            .commands(MessageGroup::commands().message_with_version::<SetValue>("two"))
            .events(events())
            .compile();
        assert!(matches!(result, Err(CompileError::InvalidMessageVersion(_))));
    }

    #[test]
    fn test_must_compile_panics_for_each_invalid_definition() {
        let base = || DomainDefinition::new(VALUE_URI).aggregate::<Value>();
        let cases: Vec<(&str, DomainDefinition)> = vec![
            (
                "missing aggregate",
                DomainDefinition::new(VALUE_URI).commands(commands()).events(events()),
            ),
            (
                "unserializable aggregate",
                DomainDefinition::new(VALUE_URI)
                    .aggregate::<Unserializable>()
                    .commands(commands())
                    .events(events()),
            ),
            (
                "invalid uri",
                DomainDefinition::new("a/b/c")
                    .aggregate::<Value>()
                    .commands(commands())
                    .events(events()),
            ),
            ("missing commands", base().events(events())),
            (
                "empty commands",
                base().commands(MessageGroup::commands()).events(events()),
            ),
            ("mistyped commands", base().commands(events()).events(events())),
            ("missing events", base().commands(commands())),
            ("empty events", base().commands(commands()).events(MessageGroup::events())),
            ("mistyped events", base().commands(commands()).events(commands())),
            (
                "foreign member",
                base().commands(commands().message::<Foreign>()).events(events()),
            ),
            (
                "unparsable version",
                base()
                    .commands(MessageGroup::commands().message_with_version::<SetValue>("two"))
                    .events(events()),
            ),
            (
                "duplicate message",
                base()
                    .commands(commands().message_with_version::<SetValue>("2"))
                    .events(events()),
            ),
        ];

        for (label, definition) in cases {
            let expected = definition.clone().compile().expect_err(label);
            let panic = catch_unwind(AssertUnwindSafe(|| must_compile(definition)))
                .expect_err(label);
            let text = panic.downcast_ref::<String>().cloned().unwrap_or_default();
            assert!(text.contains(&expected.to_string()), "{label}: {text}");
        }
    }

    #[test]
    fn test_duplicate_messages() {
        let result = DomainDefinition::new(VALUE_URI)
            .aggregate::<Value>()
            .commands(commands().message_with_version::<SetValue>("2"))
            .events(events())
            .compile();
        assert_eq!(
            result.unwrap_err(),
            CompileError::DuplicateMessage("SetValue".to_string())
        );
    }
}

mod catalog {
    use super::*;

    #[test]
    fn test_views_only_find_their_partition() {
        let domain = value_definition().compile().unwrap();
        let catalog = domain.message_types();
        let set_id = catalog.by_type::<SetValue>().unwrap().message_type_id();
        let event_id = catalog.by_type::<ValueSet>().unwrap().message_type_id();

        assert_eq!(catalog.commands().len(), 2);
        assert_eq!(catalog.events().len(), 2);
        assert!(catalog.commands().by_id(set_id).is_some());
        assert!(catalog.events().by_id(set_id).is_none());
        assert!(catalog.events().by_type::<ValueSet>().is_some());
        assert!(catalog.commands().by_type::<ValueSet>().is_none());

        let payload: &dyn Payload = &ValueSet {
            value: "x".to_string(),
        };
        assert!(catalog.events().by_instance(payload).is_some());
        assert!(catalog.commands().by_instance(payload).is_none());

        assert_eq!(domain.messages(&[set_id, event_id]).len(), 2);
        assert_eq!(domain.commands(&[set_id, event_id]).len(), 1);
        assert_eq!(domain.events(&[set_id, event_id]).len(), 1);
    }

    #[test]
    fn test_foreign_payload_is_unknown() {
        let domain = value_definition().compile().unwrap();
        assert!(domain.message_type(&Foreign {}).is_none());
        assert!(domain.message_types().by_type::<Foreign>().is_none());
    }

    #[test]
    fn test_decode_rejects_empty_and_garbage() {
        let domain = value_definition().compile().unwrap();
        let set = domain.message_types().by_type::<SetValue>().unwrap();

        assert!(set.decode(b"").is_err());
        assert!(set.decode(b"not json").is_err());

        let payload = set.decode(br#"{"value":"hi"}"#).unwrap();
        assert_eq!(
            payload.downcast_ref::<SetValue>(),
            Some(&SetValue {
                value: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_display_lists_catalog() {
        let domain = value_definition().compile().unwrap();
        let text = domain.to_string();
        assert!(text.starts_with("valuechanger v1"));
        assert!(text.contains("[C] SetValue v1"));
        assert!(text.contains("[E] ValueCleared v1"));
    }
}
