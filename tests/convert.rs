//! End-to-end conversion tests
//!
//! Everything here runs against real files in the system temp directory,
//! since the point is the full open-convert-close path of both drivers.

// crate modules
use phitsmcpl::convert::{
    mcpl_to_phits, phits_to_mcpl, McplToPhitsConfig, PhitsToMcplConfig, INPUT_DECK_KEY,
};
use phitsmcpl::dump::DumpWriter;
use phitsmcpl::framing::MarkerWidth;
use phitsmcpl::mcpl::McplWriter;
use phitsmcpl::readers::{DumpReader, McplReader};
use phitsmcpl::Particle;

// standard library
use std::path::PathBuf;

// external crates
use rstest::rstest;

/// Unique scratch path so parallel tests never collide
fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("phitsmcpl_it_{}_{name}", std::process::id()))
}

fn cleanup(paths: &[&PathBuf]) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}

fn particle(pdgcode: i32, seed: f64) -> Particle {
    Particle {
        pdgcode,
        position: [seed, seed + 1.0, seed + 2.0],
        direction: [0.0, 0.6, 0.8],
        polarisation: [0.0; 3],
        ekin: 14.1 + seed,
        time: 2.5 + seed,
        weight: 0.75,
    }
}

/// Write a double-precision MCPL file with the given particles
fn write_mcpl(path: &PathBuf, particles: &[Particle], polarisation: bool) {
    let mut writer = McplWriter::create(path).unwrap();
    writer.set_source_name("PHITS").unwrap();
    writer.enable_double_precision().unwrap();
    if polarisation {
        writer.enable_polarisation().unwrap();
    }
    for p in particles {
        writer.add_particle(p).unwrap();
    }
    writer.close().unwrap();
}

fn dump_config(input: &PathBuf, output: &PathBuf) -> McplToPhitsConfig {
    McplToPhitsConfig {
        input: input.clone(),
        output: output.clone(),
        marker_bytes: 4,
        polarisation: true,
        limit: 0,
        progress: false,
    }
}

fn mcpl_config(input: &PathBuf, output: &PathBuf) -> PhitsToMcplConfig {
    PhitsToMcplConfig {
        input: input.clone(),
        output: output.clone(),
        double_precision: true,
        gzip: false,
        input_deck: None,
        dump_summary: None,
        progress: false,
    }
}

#[test]
fn round_trip_preserves_particles() {
    let mcpl_in = scratch("rt_in.mcpl");
    let dmp = scratch("rt.dmp");
    let mcpl_out = scratch("rt_out.mcpl");

    let originals = vec![
        particle(2112, 0.0),
        particle(22, 1.0),
        particle(2212, 2.0),
        particle(1000020040, 3.0), // alpha survives as an ion code
    ];
    write_mcpl(&mcpl_in, &originals, true);

    let to_dump = mcpl_to_phits(&dump_config(&mcpl_in, &dmp)).unwrap();
    assert_eq!(to_dump.written, 4);
    assert_eq!(to_dump.skipped, 0);

    let back = phits_to_mcpl(&mcpl_config(&dmp, &mcpl_out)).unwrap();
    assert_eq!(back.written, 4);

    let mut reader = McplReader::open(&mcpl_out).unwrap();
    for original in &originals {
        let converted = reader.load().unwrap().unwrap();
        assert_eq!(converted.pdgcode, original.pdgcode);
        assert_eq!(converted.position, original.position);
        assert_eq!(converted.direction, original.direction);
        assert_eq!(converted.ekin, original.ekin);
        assert_eq!(converted.weight, original.weight);
        // two unit conversions, so only floating-point close
        let drift = (converted.time - original.time).abs();
        assert!(drift <= 1e-12 * original.time.abs(), "time drifted by {drift}");
    }
    assert!(reader.load().unwrap().is_none());

    cleanup(&[&mcpl_in, &dmp, &mcpl_out]);
}

#[test]
fn untranslatable_pdg_codes_are_skipped_with_accounting() {
    let mcpl_in = scratch("skip_in.mcpl");
    let dmp = scratch("skip.dmp");

    // neutron, photon, and a code nothing can transport
    let particles = vec![
        particle(2112, 0.0),
        particle(22, 1.0),
        particle(999999, 2.0),
    ];
    write_mcpl(&mcpl_in, &particles, false);

    let mut config = dump_config(&mcpl_in, &dmp);
    config.polarisation = false;
    let summary = mcpl_to_phits(&config).unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(summary.skipped, 1);

    // exactly two 10-field records with 4-byte markers
    let bytes = std::fs::read(&dmp).unwrap();
    assert_eq!(bytes.len(), 2 * (4 + 80 + 4));

    // declaration order preserved
    let mut reader = DumpReader::open(&dmp).unwrap();
    assert_eq!(reader.load().unwrap().unwrap().raw_code, 2112);
    assert_eq!(reader.load().unwrap().unwrap().raw_code, 22);
    assert!(reader.load().unwrap().is_none());

    cleanup(&[&mcpl_in, &dmp]);
}

#[test]
fn unmapped_dump_codes_are_skipped_with_accounting() {
    let dmp = scratch("unmapped.dmp");
    let mcpl_out = scratch("unmapped.mcpl");

    // 13-field records with 64-bit markers, second code unmapped
    let mut writer = DumpWriter::create(&dmp, MarkerWidth::Eight, true).unwrap();
    writer.write(2112, &particle(2112, 0.0)).unwrap();
    writer.write(999999, &particle(0, 1.0)).unwrap();
    writer.close().unwrap();

    let summary = phits_to_mcpl(&mcpl_config(&dmp, &mcpl_out)).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 1);

    let mut reader = McplReader::open(&mcpl_out).unwrap();
    assert_eq!(reader.nparticles(), 1);
    assert_eq!(reader.load().unwrap().unwrap().pdgcode, 2112);

    cleanup(&[&dmp, &mcpl_out]);
}

#[test]
fn zero_pdg_code_is_never_written() {
    let mcpl_in = scratch("zero_in.mcpl");
    let dmp = scratch("zero.dmp");

    let particles = vec![particle(0, 0.0), particle(22, 1.0)];
    write_mcpl(&mcpl_in, &particles, false);

    let mut config = dump_config(&mcpl_in, &dmp);
    config.polarisation = false;
    let summary = mcpl_to_phits(&config).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 1);

    let mut reader = DumpReader::open(&dmp).unwrap();
    assert_eq!(reader.load().unwrap().unwrap().raw_code, 22);
    assert!(reader.load().unwrap().is_none());

    cleanup(&[&mcpl_in, &dmp]);
}

#[rstest]
#[case(1, 1)]
#[case(3, 3)]
#[case(5, 5)]
#[case(10, 5)] // limits beyond the total are harmless
fn particle_limit_caps_the_output(#[case] limit: u64, #[case] expected: u64) {
    let mcpl_in = scratch(&format!("limit{limit}_in.mcpl"));
    let dmp = scratch(&format!("limit{limit}.dmp"));

    let particles = (0..5).map(|i| particle(2112, i as f64)).collect::<Vec<_>>();
    write_mcpl(&mcpl_in, &particles, false);

    let mut config = dump_config(&mcpl_in, &dmp);
    config.polarisation = false;
    config.limit = limit;
    let summary = mcpl_to_phits(&config).unwrap();

    assert_eq!(summary.written, expected);
    let bytes = std::fs::read(&dmp).unwrap();
    assert_eq!(bytes.len() as u64, expected * 88);

    cleanup(&[&mcpl_in, &dmp]);
}

#[rstest]
#[case(4, false)]
#[case(4, true)]
#[case(8, false)]
#[case(8, true)]
fn dump_layout_detected_from_the_file(#[case] marker_bytes: usize, #[case] polarisation: bool) {
    let dmp = scratch(&format!("detect_{marker_bytes}_{polarisation}.dmp"));

    let marker = MarkerWidth::from_bytes(marker_bytes).unwrap();
    let mut writer = DumpWriter::create(&dmp, marker, polarisation).unwrap();
    for i in 0..3 {
        writer.write(2112, &particle(2112, i as f64)).unwrap();
    }
    writer.close().unwrap();

    let reader = DumpReader::open(&dmp).unwrap();
    assert_eq!(reader.marker_width(), marker);
    assert_eq!(reader.has_polarisation(), polarisation);
    assert_eq!(reader.nparticles(), 3);

    cleanup(&[&dmp]);
}

#[test]
fn invalid_marker_width_fails_before_any_io() {
    let mcpl_in = scratch("badwidth_in.mcpl");
    let dmp = scratch("badwidth.dmp");
    write_mcpl(&mcpl_in, &[particle(2112, 0.0)], false);

    let mut config = dump_config(&mcpl_in, &dmp);
    config.marker_bytes = 5;
    assert!(mcpl_to_phits(&config).is_err());
    assert!(!dmp.exists());

    cleanup(&[&mcpl_in]);
}

#[test]
fn identical_input_and_output_rejected() {
    let path = scratch("same.mcpl");
    write_mcpl(&path, &[particle(2112, 0.0)], false);

    let config = dump_config(&path, &path);
    assert!(mcpl_to_phits(&config).is_err());

    cleanup(&[&path]);
}

#[test]
fn input_deck_embedded_with_exact_length() {
    let dmp = scratch("meta.dmp");
    let deck = scratch("meta_deck.inp");
    let mcpl_out = scratch("meta.mcpl");

    let mut writer = DumpWriter::create(&dmp, MarkerWidth::Four, false).unwrap();
    writer.write(2112, &particle(2112, 0.0)).unwrap();
    writer.close().unwrap();

    let content = "[ t-userdefined ]\n  dump = 13\n  1 2 3 4 5 6 7 8 9 10 14 15 16\n";
    std::fs::write(&deck, content).unwrap();

    let mut config = mcpl_config(&dmp, &mcpl_out);
    config.input_deck = Some(deck.clone());
    phits_to_mcpl(&config).unwrap();

    let reader = McplReader::open(&mcpl_out).unwrap();
    let blob = reader.blob(INPUT_DECK_KEY).unwrap();
    assert_eq!(blob.data.len(), content.len());
    assert_eq!(blob.data, content.as_bytes());

    cleanup(&[&dmp, &deck, &mcpl_out]);
}

#[test]
fn implausible_input_deck_aborts_with_no_output() {
    let dmp = scratch("badmeta.dmp");
    let deck = scratch("badmeta_deck.inp");
    let mcpl_out = scratch("badmeta.mcpl");

    let mut writer = DumpWriter::create(&dmp, MarkerWidth::Four, false).unwrap();
    writer.write(2112, &particle(2112, 0.0)).unwrap();
    writer.close().unwrap();

    // long enough and texty, but nothing ties it to a dump run
    std::fs::write(&deck, "this is just some unrelated text file content here\n").unwrap();

    let mut config = mcpl_config(&dmp, &mcpl_out);
    config.input_deck = Some(deck.clone());
    assert!(phits_to_mcpl(&config).is_err());
    assert!(!mcpl_out.exists());

    cleanup(&[&dmp, &deck]);
}

#[test]
fn gzipped_output_reads_back_transparently() {
    let dmp = scratch("gz.dmp");
    let mcpl_out = scratch("gz.mcpl");

    let mut writer = DumpWriter::create(&dmp, MarkerWidth::Four, true).unwrap();
    for i in 0..4 {
        writer.write(2112, &particle(2112, i as f64)).unwrap();
    }
    writer.close().unwrap();

    let mut config = mcpl_config(&dmp, &mcpl_out);
    config.gzip = true;
    let summary = phits_to_mcpl(&config).unwrap();

    let gz_path = PathBuf::from(format!("{}.gz", mcpl_out.display()));
    assert_eq!(summary.output, gz_path);
    assert!(gz_path.exists());
    assert!(!mcpl_out.exists());

    let mut reader = McplReader::open(&gz_path).unwrap();
    assert_eq!(reader.nparticles(), 4);
    assert_eq!(reader.source_name(), "PHITS");
    assert!(reader.has_polarisation());
    let mut count = 0;
    while let Some(p) = reader.load().unwrap() {
        assert_eq!(p.pdgcode, 2112);
        count += 1;
    }
    assert_eq!(count, 4);

    cleanup(&[&dmp, &gz_path]);
}

#[test]
fn polarisation_survives_the_dump_format() {
    let mcpl_in = scratch("pol_in.mcpl");
    let dmp = scratch("pol.dmp");
    let mcpl_out = scratch("pol_out.mcpl");

    let mut p = particle(2112, 0.0);
    p.polarisation = [0.1, -0.2, 0.3];
    write_mcpl(&mcpl_in, &[p], true);

    mcpl_to_phits(&dump_config(&mcpl_in, &dmp)).unwrap();

    let reader = DumpReader::open(&dmp).unwrap();
    assert!(reader.has_polarisation());

    phits_to_mcpl(&mcpl_config(&dmp, &mcpl_out)).unwrap();
    let (header, particles) = phitsmcpl::read_mcpl_file(&mcpl_out).unwrap();
    assert!(header.polarisation);
    assert_eq!(particles[0].polarisation, [0.1, -0.2, 0.3]);

    cleanup(&[&mcpl_in, &dmp, &mcpl_out]);
}
