//! Calculator JSON-RPC Example
//!
//! Registers a few arithmetic methods and feeds the dispatcher the payloads
//! from the JSON-RPC 2.0 specification: single calls, named parameters,
//! notifications, errors and a mixed batch.

use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;
use turul_json_rpc_dispatch::prelude::*;

/// Per-call context the host hands to every dispatch
#[derive(Debug, Clone)]
struct Caller {
    name: String,
}

fn subtract(args: Arguments<Caller>) -> MethodResult {
    let minuend: f64 = args.parse("minuend")?;
    let subtrahend: f64 = args.parse("subtrahend")?;
    Outcome::json(minuend - subtrahend)
}

fn sum(args: Arguments<Caller>) -> MethodResult {
    let mut total = 0.0;
    for value in args.rest() {
        let Some(n) = value.as_f64() else {
            let detail = format!("not a number: {}", value);
            return Ok(Outcome::invalid_params(detail));
        };
        total += n;
    }
    Outcome::json(total)
}

fn divide(args: Arguments<Caller>) -> MethodResult {
    let dividend: f64 = args.parse("dividend")?;
    let divisor: f64 = args.parse("divisor")?;
    if divisor == 0.0 {
        return Ok(Outcome::failure(1, "Division by zero"));
    }
    Outcome::json(dividend / divisor)
}

async fn whoami(args: Arguments<Caller>) -> MethodResult {
    let name = args.context().map(|caller| caller.name.clone());
    Ok(Outcome::success(name.unwrap_or_default()))
}

fn update(args: Arguments<Caller>) -> MethodResult {
    info!("update received {} values", args.rest().len());
    Ok(Outcome::null())
}

fn calculator() -> Methods<Caller> {
    let variadic = Signature::new().variadic_positional();
    Methods::new()
        .with(sync_method(
            "subtract",
            Signature::positional(["minuend", "subtrahend"]),
            subtract,
        ))
        .with(sync_method("sum", variadic.clone(), sum))
        .with(sync_method(
            "divide",
            Signature::positional(["dividend", "divisor"]),
            divide,
        ))
        .with(method("whoami", Signature::new().with_context(), whoami))
        .with(sync_method("update", variadic, update))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = DispatchConfig::default().debug(true);
    let dispatcher = Dispatcher::new(config);
    let methods = calculator();
    let caller = Caller {
        name: "example".to_string(),
    };

    let payloads = [
        r#"{"jsonrpc":"2.0","method":"subtract","params":[42,23],"id":1}"#,
        r#"{"jsonrpc":"2.0","method":"subtract","params":{"subtrahend":23,"minuend":42},"id":3}"#,
        r#"{"jsonrpc":"2.0","method":"update","params":[1,2,3,4,5]}"#,
        r#"{"jsonrpc":"2.0","method":"divide","params":[1,0],"id":"div"}"#,
        r#"{"jsonrpc":"2.0","method":"whoami","id":"me"}"#,
        r#"{"jsonrpc":"2.0","method":"foobar","id":"1"}"#,
        r#"{"jsonrpc":"2.0","method":"foobar,"params":"bar","baz]"#,
        r#"[
            {"jsonrpc":"2.0","method":"sum","params":[1,2,4],"id":"1"},
            {"jsonrpc":"2.0","method":"update","params":[7]},
            {"jsonrpc":"2.0","method":"subtract","params":[42,23],"id":"2"},
            {"foo":"boo"},
            {"jsonrpc":"2.0","method":"foo.get","params":{"name":"myself"},"id":"5"}
        ]"#,
    ];

    for payload in payloads {
        let reply = dispatcher
            .dispatch_to_json(payload, &methods, Some(caller.clone()))
            .await?;
        match reply {
            Some(body) => {
                let pretty: Value = serde_json::from_str(&body)?;
                println!("{}\n", serde_json::to_string_pretty(&pretty)?);
            }
            None => println!("(no response)\n"),
        }
    }

    Ok(())
}
