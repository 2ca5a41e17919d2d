use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream;

use crate::value::Map;
use crate::{Array, ChunkSource, ParseError, PullParser, Unparsed, Value, ValueKind};

pub(crate) fn parser_over(chunks: &[&str]) -> PullParser<impl ChunkSource> {
    let owned: Vec<String> = chunks.iter().map(|s| (*s).to_string()).collect();
    PullParser::new(stream::iter(owned))
}

/// Split `src` into chunks whose sizes are driven by `splits`, without
/// breaking code points. Exhausting `splits` puts the rest in one final
/// chunk.
pub(crate) fn partition(src: &str, splits: &[usize]) -> Vec<String> {
    let chars: Vec<char> = src.chars().collect();
    let mut chunks = Vec::new();
    let mut idx = 0;
    let mut remaining = chars.len();
    for s in splits {
        if remaining == 0 {
            break;
        }
        let size = 1 + (s % remaining);
        let end = idx + size;
        chunks.push(chars[idx..end].iter().collect());
        idx = end;
        remaining -= size;
    }
    if remaining > 0 {
        chunks.push(chars[idx..].iter().collect());
    }
    chunks
}

/// Read one value entirely through the lazy surface: cursors for the
/// containers, the chunked reader for strings, typed readers for the
/// scalars.
pub(crate) fn read_via_cursors<'a, S: ChunkSource>(
    parser: &'a mut PullParser<S>,
) -> LocalBoxFuture<'a, Result<Value, ParseError>> {
    async move {
        Ok(match parser.peek_type().await? {
            ValueKind::Null => {
                parser.read_null().await?;
                Value::Null
            }
            ValueKind::Boolean => Value::Boolean(parser.read_bool().await?),
            ValueKind::Number => Value::Number(parser.read_number().await?),
            ValueKind::String => {
                let mut chunks = parser.read_string_chunked().await?;
                let mut s = String::new();
                while let Some(frag) = chunks.next(parser).await? {
                    s.push_str(&frag);
                }
                Value::String(s)
            }
            ValueKind::Object => {
                let mut obj = parser.enter_object().await?;
                let mut map = Map::new();
                while let Some(mut entry) = obj.next_entry(parser).await? {
                    let v = read_handle(&mut entry.value, parser).await?;
                    map.insert(entry.key, v);
                }
                Value::Object(map)
            }
            ValueKind::Array => {
                let mut arr = parser.enter_array().await?;
                let mut items = Array::new();
                while let Some(mut el) = arr.next_element(parser).await? {
                    items.push(read_handle(&mut el.value, parser).await?);
                }
                Value::Array(items)
            }
        })
    }
    .boxed_local()
}

fn read_handle<'a, S: ChunkSource>(
    handle: &'a mut Unparsed,
    parser: &'a mut PullParser<S>,
) -> LocalBoxFuture<'a, Result<Value, ParseError>> {
    async move {
        Ok(match handle.peek(parser).await? {
            ValueKind::Null => {
                handle.read_null(parser).await?;
                Value::Null
            }
            ValueKind::Boolean => Value::Boolean(handle.read_bool(parser).await?),
            ValueKind::Number => Value::Number(handle.read_number(parser).await?),
            ValueKind::String => {
                let mut chunks = handle.read_string_chunked(parser).await?;
                let mut s = String::new();
                while let Some(frag) = chunks.next(parser).await? {
                    s.push_str(&frag);
                }
                Value::String(s)
            }
            ValueKind::Object => {
                let mut obj = handle.enter_object(parser).await?;
                let mut map = Map::new();
                while let Some(mut entry) = obj.next_entry(parser).await? {
                    let v = read_handle(&mut entry.value, parser).await?;
                    map.insert(entry.key, v);
                }
                Value::Object(map)
            }
            ValueKind::Array => {
                let mut arr = handle.enter_array(parser).await?;
                let mut items = Array::new();
                while let Some(mut el) = arr.next_element(parser).await? {
                    items.push(read_handle(&mut el.value, parser).await?);
                }
                Value::Array(items)
            }
        })
    }
    .boxed_local()
}
