//! Reacting to content-moderation feedback while a tool-call response is
//! still streaming from the model.
//!
//! The assistant answers with a JSON object describing a generated code
//! snippet. A `moderation` field comes first so the backend can abort
//! before the expensive part of the payload arrives; the `code` string is
//! printed fragment by fragment as it streams in, the way a UI would
//! render it character by character. A `commentary` field interleaves
//! prose with `<plan>`-tagged reasoning, which the segment splitter
//! separates and the synchronized reducer folds into a transcript while
//! mirroring every delta downstream.
//!
//! Run with
//!
//! ```bash
//! cargo run -p jsonpull --example llm_tool_call
//! ```

use std::convert::Infallible;
use std::io::Write as _;

use futures::executor::block_on;
use futures::stream;
use jsonpull::{ParseError, PullParser, SegmentDelta, SegmentKind, SegmentSplitter, SyncedReducer};

fn main() {
    // A toy assistant response streamed in small, irregular chunks. In
    // real life these come from the network, token by token.
    let simulated_stream: [&str; 9] = [
        r#"{"moderation":{"decision":"al"#,
        r#"lo"#,
        r#"w","reason":null},"#,
        r#""filename":"example.rs","#,
        r#""commentary":"Sketching first.<plan>Reuse the parser "#,
        r#"module.</plan>Here is the file.","#,
        r#""code":"use jsonpull::PullParser;\n\nfn main() {\n"#,
        r#"    println!(\"streaming\");\n}\n"#,
        r#""}"#,
    ];

    let chunks: Vec<String> = simulated_stream.iter().map(|s| (*s).to_string()).collect();
    let mut parser = PullParser::new(stream::iter(chunks));

    let outcome = block_on(async {
        let mut root = parser.enter_object().await?;
        while let Some(mut entry) = root.next_entry(&mut parser).await? {
            match entry.key.as_str() {
                "moderation" => {
                    let mut moderation = entry.value.enter_object(&mut parser).await?;
                    while let Some(mut field) = moderation.next_entry(&mut parser).await? {
                        if field.key == "decision" {
                            let decision = field.value.read_string(&mut parser).await?;
                            if decision == "block" {
                                eprintln!("moderation blocked the content, aborting");
                                return Ok(false);
                            }
                            println!("moderation decision: {decision}");
                        }
                    }
                }
                "commentary" => {
                    let transcript = split_commentary(&mut entry.value, &mut parser).await?;
                    println!("commentary: {}", transcript.prose);
                    println!("reasoning:  {}", transcript.reasoning);
                }
                "code" => {
                    let mut code = entry.value.read_string_chunked(&mut parser).await?;
                    println!("--- code ---");
                    while let Some(fragment) = code.next(&mut parser).await? {
                        print!("{fragment}");
                        std::io::stdout().flush().ok();
                    }
                    println!("--- end ----");
                }
                // Everything else is skipped without materializing it.
                _ => {}
            }
        }
        Ok::<_, ParseError>(true)
    });

    match outcome {
        Ok(true) => println!("stream complete"),
        Ok(false) => {}
        Err(err) => eprintln!("stream failed: {err}"),
    }
}

#[derive(Debug, Default, Clone)]
struct Transcript {
    prose: String,
    reasoning: String,
}

/// Drains the commentary string through the chunked reader, splits it
/// into prose and reasoning, and folds the deltas through a synchronized
/// reducer, exactly as a chat front-end would.
async fn split_commentary<S: jsonpull::ChunkSource>(
    handle: &mut jsonpull::Unparsed,
    parser: &mut PullParser<S>,
) -> Result<Transcript, ParseError> {
    let (mut reducer, _actions) = SyncedReducer::new(
        Transcript::default(),
        |state: &Transcript, delta: &SegmentDelta| {
            let mut next = state.clone();
            match delta.kind {
                SegmentKind::Prose => next.prose.push_str(&delta.text),
                SegmentKind::Reasoning => next.reasoning.push_str(&delta.text),
            }
            Ok::<_, Infallible>(next)
        },
    );

    let mut splitter = SegmentSplitter::new();
    let mut chunks = handle.read_string_chunked(parser).await?;
    while let Some(fragment) = chunks.next(parser).await? {
        for delta in splitter.append(&fragment) {
            reducer.dispatch(delta).unwrap();
        }
    }
    reducer.done();
    Ok(reducer.state().clone())
}
