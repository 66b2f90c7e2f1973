//! Generate golden vectors for cross-implementation codec tests.
//!
//! Writes binary fixtures to a shared directory that other language
//! implementations can read back and assert against.

use std::fs;
use std::path::Path;

use weft_types::{Type, TypeEnv, Value};
use weft_wire::encode_args;

fn write_vector(dir: &Path, name: &str, bytes: &[u8]) {
    let path = dir.join(format!("{}.bin", name));
    fs::write(&path, bytes).expect("failed to write golden vector");
    println!("Wrote {} bytes to {}", bytes.len(), path.display());
}

fn main() {
    let out_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("test-fixtures/golden-vectors");

    fs::create_dir_all(&out_dir).expect("failed to create output directory");
    println!("Writing golden vectors to {}\n", out_dir.display());

    let empty = TypeEnv::new();

    write_vector(
        &out_dir,
        "nat_42",
        &encode_args(&empty, &[Type::Nat], &[Value::nat(42u32)]).unwrap(),
    );

    write_vector(
        &out_dir,
        "text_hi",
        &encode_args(&empty, &[Type::Text], &[Value::text("hi")]).unwrap(),
    );

    write_vector(
        &out_dir,
        "opt_nat_some",
        &encode_args(
            &empty,
            &[Type::option(Type::Nat)],
            &[Value::some(Value::nat(5u32))],
        )
        .unwrap(),
    );

    write_vector(
        &out_dir,
        "vec_nat",
        &encode_args(
            &empty,
            &[Type::vector(Type::Nat)],
            &[Value::Vector(vec![
                Value::nat(1u32),
                Value::nat(2u32),
                Value::nat(3u32),
            ])],
        )
        .unwrap(),
    );

    let point = Type::record([("x", Type::Int32), ("y", Type::Int32)]).unwrap();
    write_vector(
        &out_dir,
        "record_point",
        &encode_args(
            &empty,
            &[point],
            &[Value::record([
                ("x", Value::Int32(3)),
                ("y", Value::Int32(-4)),
            ])],
        )
        .unwrap(),
    );

    // Three-node linked list through a recursive table entry.
    let mut env = TypeEnv::new();
    let node = env.reserve();
    env.define(
        &node,
        Type::record([("value", Type::Nat), ("next", Type::option(node.clone()))]).unwrap(),
    )
    .unwrap();
    let mut list = Value::record([("value", Value::nat(3u32)), ("next", Value::none())]);
    for v in [2u32, 1] {
        list = Value::record([("value", Value::nat(v)), ("next", Value::some(list))]);
    }
    write_vector(
        &out_dir,
        "recursive_list",
        &encode_args(&env, &[node], &[list]).unwrap(),
    );
}
