//! Test registry - all test cases are registered here

pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Each test:
/// 1. Queues a mock upstream response (what the Messages API would return)
/// 2. Sends a request to the REAL relay
/// 3. Validates the response and what upstream received
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                needs_binary: false,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    // Cases that run the client subcommands of the relay binary
    macro_rules! binary_test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                needs_binary: true,
                ..test!($name, $desc, $func)
            }
        };
    }

    vec![
        // ── Relay contract ──────────────────────────────────────────────────────
        test!(
            "relay/options_preflight",
            "OPTIONS returns 200 with CORS headers and no upstream call",
            relay::test_options_preflight
        ),
        test!(
            "relay/method_not_allowed",
            "GET/PUT/DELETE are refused with 405",
            relay::test_method_not_allowed
        ),
        test!("relay/health", "/health answers OK", relay::test_health),
        test!(
            "relay/buffered_passthrough",
            "Buffered upstream JSON reaches the caller; key and version headers injected",
            relay::test_buffered_passthrough
        ),
        test!(
            "relay/defaults_applied",
            "Missing model and max_tokens get defaults; optional fields omitted",
            relay::test_defaults_applied
        ),
        test!(
            "relay/fields_forwarded",
            "model, max_tokens, system, tools and messages are forwarded as given",
            relay::test_fields_forwarded
        ),
        test!(
            "relay/falsy_fields",
            "Empty system and stream:false are dropped, tools:[] is kept",
            relay::test_falsy_fields
        ),
        test!(
            "relay/upstream_error_passthrough",
            "Upstream error status and body are relayed verbatim",
            relay::test_upstream_error_passthrough
        ),
        test!(
            "relay/invalid_body",
            "Non-JSON body yields a 500 Function error",
            relay::test_invalid_body
        ),
        test!(
            "relay/legacy_path",
            "/.netlify/functions/ai behaves like /ai",
            relay::test_legacy_path
        ),

        // ── Streaming ───────────────────────────────────────────────────────────
        test!(
            "streaming/passthrough",
            "Event stream bytes are forwarded unchanged",
            streaming::test_stream_passthrough
        ),
        test!(
            "streaming/flag_forwarded",
            "stream:true reaches upstream",
            streaming::test_stream_flag_forwarded
        ),
        test!(
            "streaming/headers",
            "Streamed response has event-stream and no-cache headers",
            streaming::test_stream_headers
        ),
        test!(
            "streaming/upstream_error",
            "Upstream refusal of a stream request is relayed as JSON",
            streaming::test_stream_upstream_error
        ),

        // ── Client subcommands ──────────────────────────────────────────────────
        binary_test!("cli/ask", "`ask` prints the concatenated answer", cli::test_ask),
        binary_test!("cli/stream", "`stream` prints the streamed answer", cli::test_stream),
        binary_test!("cli/search", "`search` prints the extracted JSON array", cli::test_search),
        binary_test!(
            "cli/ask_upstream_error",
            "`ask` exits non-zero when upstream fails",
            cli::test_ask_upstream_error
        ),
    ]
}
