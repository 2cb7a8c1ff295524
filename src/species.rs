//! Particle type-code translation between PHITS and PDG numbering
//!
//! PHITS identifies particle species by "kf-code", which follows the PDG
//! numbering scheme for every non-ion species it can transport. Nuclides use
//! a different packing in each scheme:
//!
//! | Scheme | Nuclide code                                  |
//! | ------ | --------------------------------------------- |
//! | PHITS  | `Z*1000000 + A`                               |
//! | PDG    | `10LZZZAAAI` i.e. `1000000000 + Z*10000 + A*10` |
//!
//! The mapping is partial in both directions. Anything outside the known
//! species table and the sane nuclide range translates to 0, which callers
//! treat as "no valid species" and skip with accounting. Excited nuclear
//! states (isomer digit `I`) and hypernuclei (`L`) have no PHITS counterpart
//! and also translate to 0.
//!
//! Both directions are pure lookups over fixed data. For every code `c` in
//! the domain, `kf_from_pdg(pdg_from_kf(c)) == c`.

/// Codes shared verbatim by the PHITS kf and PDG schemes
///
/// The non-ion species PHITS is able to transport, from the particle table of
/// the PHITS manual. Sorted for binary search. This is domain data, not
/// something to derive.
const KF_PDG_COMMON: [i32; 34] = [
    -3334, // anti-omega-
    -3322, // anti-xi0
    -3312, // anti-xi-
    -3222, // anti-sigma+
    -3212, // anti-sigma0
    -3122, // anti-lambda0
    -3112, // anti-sigma-
    -2212, // anti-proton
    -2112, // anti-neutron
    -321,  // kaon-
    -311,  // anti-kaon0
    -211,  // pion-
    -14,   // anti-nu_mu
    -13,   // muon+
    -12,   // anti-nu_e
    -11,   // positron
    11,    // electron
    12,    // nu_e
    13,    // muon-
    14,    // nu_mu
    22,    // photon
    111,   // pion0
    211,   // pion+
    311,   // kaon0
    321,   // kaon+
    2112,  // neutron
    2212,  // proton
    3112,  // sigma-
    3122,  // lambda0
    3212,  // sigma0
    3222,  // sigma+
    3312,  // xi-
    3322,  // xi0
    3334,  // omega-
];

/// Sanity bound on proton number for nuclide conversion
const MAX_Z: i64 = 120;

/// Sanity bound on mass number for nuclide conversion
const MAX_A: i64 = 300;

/// Translate a raw PHITS kf-code to the PDG scheme
///
/// Takes an i64 since the raw value comes straight out of a double-precision
/// dump field and may hold any garbage. Returns 0 when the code has no PDG
/// counterpart.
///
/// ```rust
/// # use phitsmcpl::species::pdg_from_kf;
/// assert_eq!(pdg_from_kf(2112), 2112);             // neutron
/// assert_eq!(pdg_from_kf(2000004), 1000020040);    // alpha
/// assert_eq!(pdg_from_kf(999999), 0);              // nonsense
/// ```
pub fn pdg_from_kf(kf: i64) -> i32 {
    if kf == 0 {
        return 0;
    }
    if kf.unsigned_abs() < 1_000_000 {
        let code = kf as i32;
        match KF_PDG_COMMON.binary_search(&code) {
            Ok(_) => code,
            Err(_) => 0,
        }
    } else if kf > 0 {
        // nuclide, packed as Z*1e6 + A
        let z = kf / 1_000_000;
        let a = kf % 1_000_000;
        if (1..=MAX_Z).contains(&z) && (z..=MAX_A).contains(&a) {
            (1_000_000_000 + z * 10_000 + a * 10) as i32
        } else {
            0
        }
    } else {
        // negative codes above the table range would be anti-ions
        0
    }
}

/// Translate a PDG code to the PHITS kf scheme
///
/// Returns 0 when the code has no kf counterpart, including nuclides with a
/// nonzero isomer or strangeness digit.
///
/// ```rust
/// # use phitsmcpl::species::kf_from_pdg;
/// assert_eq!(kf_from_pdg(22), 22);                 // photon
/// assert_eq!(kf_from_pdg(1000010020), 1000002);    // deuteron
/// assert_eq!(kf_from_pdg(999999), 0);              // nonsense
/// ```
pub fn kf_from_pdg(pdg: i32) -> i32 {
    if pdg == 0 {
        return 0;
    }
    if pdg.unsigned_abs() < 1_000_000 {
        match KF_PDG_COMMON.binary_search(&pdg) {
            Ok(_) => pdg,
            Err(_) => 0,
        }
    } else if pdg >= 1_000_000_000 {
        // nuclide, packed as 10LZZZAAAI
        let pdg = pdg as i64;
        let i = pdg % 10;
        let a = (pdg / 10) % 1000;
        let z = (pdg / 10_000) % 1000;
        let l = (pdg / 10_000_000) % 10;
        if i == 0 && l == 0 && (1..=MAX_Z).contains(&z) && (z..=MAX_A).contains(&a) {
            (z * 1_000_000 + a) as i32
        } else {
            0
        }
    } else {
        0
    }
}
