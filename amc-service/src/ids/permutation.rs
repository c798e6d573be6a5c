//! Keyed integer permutations
//!
//! The numeric layer of the obfuscator. Each permutation is a bijection over a
//! fixed domain `[0, domain)` so sequential row ids come out scattered but can
//! always be recovered.

use rand::Rng;

use super::IdConfigError;

/// Additive constant of the Feistel round function
const FEISTEL_ROUND_OFFSET: u128 = 150_889;

/// Upper bound (inclusive) of one Feistel round output
const FEISTEL_ROUND_SPAN: u128 = 32_767;

const FEISTEL_ROUNDS: usize = 3;

/// Name of the database-side permutation function
pub const FEISTEL_FUNCTION_NAME: &str = "obscure_id";

/// Sequence shared by every table that draws ids from the database function
pub const GLOBAL_SEQUENCE_NAME: &str = "global_id_seq";

/// A keyed bijection over `[0, domain)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permutation {
    /// `key * id mod modulus`
    Multiplicative(Multiplicative),
    /// Three round Feistel network over 32-bit values
    Feistel(Feistel),
}

impl Permutation {
    /// Exclusive upper bound of the values this permutation accepts
    pub fn domain(&self) -> u64 {
        match self {
            Self::Multiplicative(m) => m.modulus,
            Self::Feistel(_) => Feistel::DOMAIN,
        }
    }

    /// Map an internal id to its permuted value.
    ///
    /// Callers must check `value < self.domain()` first.
    pub fn permute(&self, value: u64) -> u64 {
        match self {
            Self::Multiplicative(m) => m.permute(value),
            Self::Feistel(f) => f.permute(value),
        }
    }

    /// Inverse of [`Permutation::permute`]
    pub fn invert(&self, value: u64) -> u64 {
        match self {
            Self::Multiplicative(m) => m.invert(value),
            Self::Feistel(f) => f.invert(value),
        }
    }
}

/// Modular multiplication by a key coprime to the modulus.
///
/// The inverse key is computed once with the extended Euclidean algorithm, so
/// decoding is a single multiplication as well. All products are taken in
/// `u128`, which leaves headroom for any `u64` modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiplicative {
    modulus: u64,
    key: u64,
    inverse: u64,
}

impl Multiplicative {
    /// Build the permutation, failing when `key` has no inverse mod `modulus`.
    pub fn new(key: u64, modulus: u64) -> Result<Self, IdConfigError> {
        if modulus < 2 {
            return Err(IdConfigError::ModulusTooSmall(modulus));
        }
        let key = key % modulus;
        let inverse = mod_inverse(key, modulus).ok_or(IdConfigError::NotCoprime {
            key,
            modulus,
        })?;
        Ok(Self {
            modulus,
            key,
            inverse,
        })
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn inverse(&self) -> u64 {
        self.inverse
    }

    fn permute(&self, value: u64) -> u64 {
        mul_mod(self.key, value, self.modulus)
    }

    fn invert(&self, value: u64) -> u64 {
        mul_mod(self.inverse, value, self.modulus)
    }
}

/// Feistel network operating on the two 16-bit halves of a 32-bit value.
///
/// The round function only needs to be deterministic; invertibility comes from
/// the network structure. `key` and `modulus` parameterize the round function
/// and are the same values the database function is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feistel {
    key: u64,
    modulus: u64,
}

impl Feistel {
    /// Values must fit in 32 bits
    pub const DOMAIN: u64 = 1 << 32;

    pub fn new(key: u64, modulus: u64) -> Result<Self, IdConfigError> {
        if modulus < 2 {
            return Err(IdConfigError::ModulusTooSmall(modulus));
        }
        Ok(Self { key, modulus })
    }

    fn round(&self, half: u64) -> u64 {
        let modulus = u128::from(self.modulus);
        let mixed = (u128::from(self.key) * u128::from(half) + FEISTEL_ROUND_OFFSET) % modulus;
        // mixed * SPAN / modulus rounded half up; mixed < modulus keeps it <= SPAN
        ((2 * mixed * FEISTEL_ROUND_SPAN + modulus) / (2 * modulus)) as u64
    }

    fn permute(&self, value: u64) -> u64 {
        let mut left = (value >> 16) & 0xFFFF;
        let mut right = value & 0xFFFF;
        for _ in 0..FEISTEL_ROUNDS {
            let next_right = left ^ self.round(right);
            left = right;
            right = next_right;
        }
        (right << 16) | left
    }

    fn invert(&self, value: u64) -> u64 {
        let mut right = (value >> 16) & 0xFFFF;
        let mut left = value & 0xFFFF;
        for _ in 0..FEISTEL_ROUNDS {
            let previous_left = right ^ self.round(left);
            right = left;
            left = previous_left;
        }
        (left << 16) | right
    }

    /// Render the PostgreSQL function and sequence computing this permutation.
    ///
    /// Installing it lets a column default of
    /// `obscure_id(nextval('global_id_seq'))` assign ids that are already
    /// permuted, identical to what [`Feistel`] computes in process. The round
    /// scales into `[0, 32767]` and rounds half up, which is what a numeric
    /// `::int` cast does for these non-negative values.
    pub fn to_plpgsql(&self) -> String {
        format!(
            r#"CREATE SEQUENCE IF NOT EXISTS {sequence};

CREATE OR REPLACE FUNCTION {function}(value bigint) RETURNS bigint AS $$
DECLARE
    l1 bigint;
    l2 bigint;
    r1 bigint;
    r2 bigint;
    i int := 0;
BEGIN
    l1 := (value >> 16) & 65535;
    r1 := value & 65535;
    WHILE i < {rounds} LOOP
        l2 := r1;
        r2 := l1 # div(2 * mod({key}::numeric * r1 + {offset}, {modulus}) * {span} + {modulus}, 2 * {modulus})::bigint;
        l1 := l2;
        r1 := r2;
        i := i + 1;
    END LOOP;
    RETURN (r1 << 16) + l1;
END;
$$ LANGUAGE plpgsql STRICT IMMUTABLE;
"#,
            sequence = GLOBAL_SEQUENCE_NAME,
            function = FEISTEL_FUNCTION_NAME,
            rounds = FEISTEL_ROUNDS,
            key = self.key,
            offset = FEISTEL_ROUND_OFFSET,
            modulus = self.modulus,
            span = FEISTEL_ROUND_SPAN,
        )
    }

    /// Statement removing the function rendered by [`Feistel::to_plpgsql`]
    pub fn drop_plpgsql() -> String {
        format!("DROP FUNCTION IF EXISTS {FEISTEL_FUNCTION_NAME}(value bigint);")
    }
}

fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) % u128::from(modulus)) as u64
}

/// Greatest common divisor
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Inverse of `value` modulo `modulus`, if one exists
pub fn mod_inverse(value: u64, modulus: u64) -> Option<u64> {
    let modulus = i128::from(modulus);
    let (mut old_r, mut r) = (i128::from(value) % modulus, modulus);
    let (mut old_s, mut s) = (1_i128, 0_i128);

    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }

    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(modulus) as u64)
}

/// Pick a random key in `[2, modulus)` coprime to `modulus`.
///
/// Every modulus above 2 has such a key (`modulus - 1` at worst), so the loop
/// terminates.
pub fn find_coprime(modulus: u64) -> Result<u64, IdConfigError> {
    if modulus < 3 {
        return Err(IdConfigError::ModulusTooSmall(modulus));
    }
    let mut rng = rand::rng();
    loop {
        let candidate = rng.random_range(2..modulus);
        if gcd(modulus, candidate) == 1 {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MODULUS: u64 = u32::MAX as u64;

    #[test]
    fn test_mod_inverse() {
        assert_eq!(mod_inverse(3, 7), Some(5));
        assert_eq!(mod_inverse(10, 17), Some(12));
        assert_eq!(mod_inverse(4, 8), None);
        assert_eq!(mod_inverse(0, 9), None);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(17, 5), 1);
        assert_eq!(gcd(0, 9), 9);
    }

    #[test]
    fn test_multiplicative_rejects_shared_factor() {
        let err = Multiplicative::new(6, 9).unwrap_err();
        assert!(matches!(err, IdConfigError::NotCoprime { key: 6, modulus: 9 }));
    }

    #[test]
    fn test_multiplicative_rejects_tiny_modulus() {
        assert!(matches!(
            Multiplicative::new(1, 1),
            Err(IdConfigError::ModulusTooSmall(1))
        ));
    }

    #[test]
    fn test_multiplicative_scatters_sequential_ids() {
        let perm = Multiplicative::new(542_174, MODULUS).unwrap();
        let permuted: Vec<u64> = (1..=5).map(|id| perm.permute(id)).collect();
        assert_eq!(permuted[0], 542_174);
        assert_eq!(permuted[1], 2 * 542_174);
        assert!(permuted.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_multiplicative_inverse_is_consistent() {
        let perm = Multiplicative::new(542_174, MODULUS).unwrap();
        assert_eq!(mul_mod(perm.key(), perm.inverse(), MODULUS), 1);
    }

    #[test]
    fn test_wide_modulus_does_not_overflow() {
        let modulus = u64::MAX - 58; // prime
        let perm = Multiplicative::new(0x9E37_79B9_7F4A_7C15, modulus).unwrap();
        let value = modulus - 1;
        assert_eq!(perm.invert(perm.permute(value)), value);
    }

    #[test]
    fn test_feistel_is_a_permutation_on_small_range() {
        let feistel = Feistel::new(542_174, MODULUS).unwrap();
        let mut seen = std::collections::HashSet::new();
        for value in 0..5_000 {
            let permuted = feistel.permute(value);
            assert!(permuted < Feistel::DOMAIN);
            assert!(seen.insert(permuted));
            assert_eq!(feistel.invert(permuted), value);
        }
    }

    #[test]
    fn test_feistel_round_rounds_half_up() {
        // mixed = 150889 mod 2 = 1, and 1 * 32767 / 2 = 16383.5
        let feistel = Feistel::new(0, 2).unwrap();
        assert_eq!(feistel.round(0), 16_384);
        // mixed = 150889 mod 4 = 1, and 32767 / 4 = 8191.75
        let feistel = Feistel::new(0, 4).unwrap();
        assert_eq!(feistel.round(123), 8_192);
        // mixed = 150889 mod 1048577 = 150889, and the quotient is 4715.1
        let feistel = Feistel::new(542_174, 1_048_577).unwrap();
        assert_eq!(feistel.round(0), 4_715);
    }

    #[test]
    fn test_feistel_ddl_carries_parameters() {
        let ddl = Feistel::new(542_174, 1_048_577).unwrap().to_plpgsql();
        assert!(ddl.contains("CREATE OR REPLACE FUNCTION obscure_id(value bigint)"));
        assert!(ddl.contains("542174::numeric * r1 + 150889, 1048577"));
        assert!(ddl.contains("* 32767 + 1048577, 2 * 1048577)::bigint"));
        assert!(ddl.contains("CREATE SEQUENCE IF NOT EXISTS global_id_seq"));
        assert_eq!(
            Feistel::drop_plpgsql(),
            "DROP FUNCTION IF EXISTS obscure_id(value bigint);"
        );
    }

    #[test]
    fn test_find_coprime() {
        for modulus in [3, 10, 1_048_576, MODULUS] {
            let key = find_coprime(modulus).unwrap();
            assert!(key >= 2 && key < modulus);
            assert_eq!(gcd(modulus, key), 1);
        }
        assert!(find_coprime(2).is_err());
    }

    proptest! {
        #[test]
        fn multiplicative_roundtrips(value in 0..MODULUS) {
            let perm = Multiplicative::new(542_174, MODULUS).unwrap();
            let permuted = perm.permute(value);
            prop_assert!(permuted < MODULUS);
            prop_assert_eq!(perm.invert(permuted), value);
        }

        #[test]
        fn feistel_roundtrips(value in 0..Feistel::DOMAIN, key in 1u64..1_000_000) {
            let feistel = Feistel::new(key, MODULUS).unwrap();
            prop_assert_eq!(feistel.invert(feistel.permute(value)), value);
        }
    }
}
