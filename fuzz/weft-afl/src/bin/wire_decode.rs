use afl::fuzz;
use weft::{decode_args, Type, TypeEnv};

fn main() {
    fuzz!(|data: &[u8]| {
        let env = TypeEnv::new();
        let expected = [
            Type::option(Type::Nat),
            Type::option(Type::vector(Type::Text)),
        ];
        let _ = decode_args(data, &env, &expected);
    });
}
