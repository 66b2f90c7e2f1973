use afl::fuzz;
use weft::{decode_args, encode_args, Type, TypeEnv};

fn main() {
    fuzz!(|data: &[u8]| {
        let env = TypeEnv::new();
        let expected = [Type::option(Type::record([
            ("id", Type::Nat),
            ("tags", Type::vector(Type::Text)),
        ])
        .expect("well-formed record"))];

        let Ok(values) = decode_args(data, &env, &expected) else {
            return;
        };

        // Anything that decodes must re-encode, and the re-encoding must
        // decode back to the same values.
        let bytes = encode_args(&env, &expected, &values).expect("re-encode decoded values");
        let again = decode_args(&bytes, &env, &expected).expect("decode canonical bytes");
        assert_eq!(values, again);
    });
}
