use http::StatusCode;
use postecho::console::{post_block, pretty_json, render_body};
use postecho::http::POST_RECEIVED_BODY;
use postecho::{BodyFormat, Console, EchoListener, ListenerConfig, PostClient};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _\\-]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    map.insert(key, value);
                }
                Value::Object(map)
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: pretty output parses back to the same value
    #[test]
    fn pretty_json_is_structurally_equivalent(value in arb_json()) {
        let compact = serde_json::to_string(&value).unwrap();
        let pretty = pretty_json(&compact).expect("valid JSON pretty-prints");

        let reparsed: Value = serde_json::from_str(&pretty).unwrap();
        prop_assert_eq!(reparsed, value);
    }

    /// Property: every nested line is indented by a multiple of four spaces
    #[test]
    fn pretty_json_indents_by_four(value in arb_json()) {
        let compact = serde_json::to_string(&value).unwrap();
        let pretty = pretty_json(&compact).unwrap();

        for line in pretty.lines() {
            let indent = line.len() - line.trim_start_matches(' ').len();
            prop_assert_eq!(indent % 4, 0, "line {:?}", line);
        }
    }

    /// Property: text that is not JSON is printed exactly as received
    #[test]
    fn non_json_text_is_verbatim(text in "[a-zA-Z][a-zA-Z ,.!?]{0,40}") {
        prop_assume!(serde_json::from_str::<Value>(&text).is_err());

        prop_assert_eq!(render_body(&text, BodyFormat::Json), text.as_str());
        let block = post_block(&text, BodyFormat::Json);
        let expected = format!("\n{}\n", text);
        prop_assert!(block.contains(&expected));
    }

    /// Property: raw format never changes the body
    #[test]
    fn raw_format_is_identity(text in ".{0,64}") {
        prop_assert_eq!(render_body(&text, BodyFormat::Raw), text.as_str());
    }

    /// Property: any UTF-8 body gets the same confirmation from a live listener
    #[test]
    fn live_post_always_confirms(text in "\\PC{0,64}") {
        tokio_test::block_on(async {
            let config = ListenerConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
                ..ListenerConfig::default()
            };
            let (console, captured) = Console::capture();
            let listener = EchoListener::bind_with_console(config, console).await
                .map_err(|e| TestCaseError::fail(format!("Listener setup failed: {}", e)))?;
            let addr = listener.local_addr();
            let shutdown = listener.shutdown_signal();
            let handle = tokio::spawn(listener.run());

            let response = PostClient::new(addr).post("/", text.as_bytes()).await
                .map_err(|e| TestCaseError::fail(format!("POST failed: {}", e)))?;

            let _ = shutdown.send(());
            let _ = handle.await;

            prop_assert_eq!(response.status, StatusCode::OK);
            prop_assert_eq!(response.body_text(), POST_RECEIVED_BODY);
            let expected = post_block(&text, BodyFormat::Json);
            prop_assert!(captured.contents().contains(&expected));
            Ok(())
        })?;
    }
}

#[test]
fn documented_example_renders_exactly() {
    let body = json!({"a": 1, "b": [2, 3]}).to_string();
    assert_eq!(
        render_body(&body, BodyFormat::Json),
        "{\n    \"a\": 1,\n    \"b\": [\n        2,\n        3\n    ]\n}"
    );
}
