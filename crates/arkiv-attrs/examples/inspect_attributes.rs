//! Validates `name=value` pairs and prints how each would be read back.
//!
//! ```text
//! cargo run --example inspect_attributes -- createdAt=2024-03-15T14:30:00Z homeLat=138856613 'languages=[en,de]'
//! ```

use arkiv_attrs::{validate_attribute, AttributeValue, WireValue};

fn format_value(v: &AttributeValue) -> String {
    match v {
        AttributeValue::PlainString(s) => format!("\"{}\"", s),
        AttributeValue::Integer(n) => format!("{}", n),
        AttributeValue::Url(s) => format!("URL({})", s),
        AttributeValue::Timestamp(ts) => match ts.to_rfc3339() {
            Ok(s) => format!("TIMESTAMP({})", s),
            Err(e) => format!("TIMESTAMP(<{}>)", e),
        },
        AttributeValue::TokenArray(tokens) => format!("TOKENS{:?}", tokens),
        AttributeValue::Geo(g) => format!("{:?}({:.6})", g.axis(), g.degrees()),
        AttributeValue::Version(v) => format!("VERSION({})", v),
        AttributeValue::Reference(r) => format!("REF({:?} {} on {})", r.scope, r.name, r),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: inspect_attributes name=value [name=value ...]");
        std::process::exit(2);
    }

    let mut failures = 0;
    for arg in &args {
        let Some((name, raw)) = arg.split_once('=') else {
            eprintln!("{}: expected name=value", arg);
            failures += 1;
            continue;
        };
        // Digits-only values are read as integers, like the store would hold them.
        let wire = match raw.parse::<u64>() {
            Ok(n) => WireValue::Uint(n),
            Err(_) => WireValue::Str(raw.to_string()),
        };
        match validate_attribute(name, &wire) {
            Ok(value) => println!("{:<24} {:<14} {}", name, value.kind_name(), format_value(&value)),
            Err(e) => {
                println!("{:<24} {:<14} {} ({})", name, "INVALID", e, e.class().as_str());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
