use futures::executor::block_on;
use futures::stream;
use quickcheck::QuickCheck;

use crate::tests::utils::{partition, read_via_cursors};
use crate::value::Map;
use crate::{Array, PullParser, Value};

fn parse_partitioned(src: &str, splits: &[usize]) -> Value {
    let chunks = partition(src, splits);
    let mut parser = PullParser::new(stream::iter(chunks));
    block_on(parser.read_value()).unwrap()
}

fn test_count() -> u64 {
    if is_ci::cached() {
        1_000
    } else {
        300
    }
}

/// Feeding a JSON document in arbitrary chunk sizes yields the same
/// `Value` as the document it was serialized from.
#[test]
fn partition_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, splits: Vec<usize>) -> bool {
        let src = value.to_string();
        parse_partitioned(&src, &splits) == value
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value, Vec<usize>) -> bool);
}

/// The pull parser agrees with a reference parser on every document.
#[test]
fn reference_parser_agreement_quickcheck() {
    fn from_reference(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap()),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(from_reference).collect::<Array>())
            }
            serde_json::Value::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), from_reference(v)))
                    .collect::<Map>(),
            ),
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, splits: Vec<usize>) -> bool {
        let src = value.to_string();
        let reference: serde_json::Value = serde_json::from_str(&src).unwrap();
        parse_partitioned(&src, &splits) == from_reference(&reference)
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value, Vec<usize>) -> bool);
}

/// The eager and lazy reading paths agree on every document: reading the
/// tree with `read_value` equals walking it entirely through cursors,
/// handles, and the chunked string reader.
#[test]
fn eager_lazy_equivalence_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, splits: Vec<usize>) -> bool {
        let src = value.to_string();

        let eager = parse_partitioned(&src, &splits);

        let chunks = partition(&src, &splits);
        let mut parser = PullParser::new(stream::iter(chunks));
        let lazy = block_on(read_via_cursors(&mut parser)).unwrap();

        eager == lazy && eager == value
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value, Vec<usize>) -> bool);
}

/// Skipping is transparent: iterating a container while consuming
/// nothing leaves the parser exactly where consuming everything would.
#[test]
fn skip_transparency_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, splits: Vec<usize>) -> bool {
        let src = format!("[{value},42]");
        let chunks = partition(&src, &splits);
        let mut parser = PullParser::new(stream::iter(chunks));
        block_on(async {
            let mut arr = parser.enter_array().await.unwrap();
            // First element: issued, never consumed, auto-skipped.
            arr.next_element(&mut parser).await.unwrap().unwrap();
            let mut sentinel = arr.next_element(&mut parser).await.unwrap().unwrap();
            let n = sentinel.value.read_number(&mut parser).await.unwrap();
            let end = arr.next_element(&mut parser).await.unwrap().is_none();
            n == 42.0 && end
        })
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(Value, Vec<usize>) -> bool);
}
