// Integration test harness for eisfit-rs.

mod backends;
mod cell_models;
mod interchange;
mod uncertainty;
mod workers;

pub mod test_helpers {
    use eisfit_rs::data::{log_spaced_frequencies, synthetic_spectrum};
    use eisfit_rs::{Circuit, ImpedanceSpectrum, Model, ParameterSet};
    use ndarray::Array1;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    pub const RC_R: f64 = 100.0;
    pub const RC_C: f64 = 1e-6;

    /// 50 points, 0.1 Hz to 100 kHz.
    pub fn rc_frequencies() -> Array1<f64> {
        log_spaced_frequencies(0.1, 1e5, 50)
    }

    pub fn rc_params(r: f64, c: f64) -> ParameterSet {
        ParameterSet::from_pairs([("r", r), ("c", c)])
    }

    /// Exact parallel RC spectrum.
    pub fn rc_spectrum() -> ImpedanceSpectrum {
        noisy_rc_spectrum(0.0, 0)
    }

    /// Parallel RC spectrum with proportional Gaussian noise.
    pub fn noisy_rc_spectrum(noise: f64, seed: u64) -> ImpedanceSpectrum {
        let circuit = Circuit::by_name("rc").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        synthetic_spectrum(
            &circuit,
            &rc_params(RC_R, RC_C),
            &rc_frequencies(),
            noise,
            &mut rng,
        )
        .unwrap()
    }

    /// A complete parameter set for the full-cell model.
    pub fn full_cell_params() -> ParameterSet {
        ParameterSet::from_pairs([
            ("rm", 1.0),
            ("rct", 10.0),
            ("rd", 50.0),
            ("cdl_c0", 1e-5),
            ("cdl_hnc", 1e-4),
            ("cdl_hnt", 1e-3),
            ("cdl_hnp", 0.9),
            ("cdl_hnu", 0.95),
            ("cd_c0", 1e-3),
            ("cd_hnc", 1e-2),
            ("cd_hnt", 1.0),
            ("cd_hnp", 0.8),
            ("cd_hnu", 0.9),
            ("cpe_b_t", 1e-2),
            ("cpe_b_p", 0.9),
            ("sep_r1", 2.0),
            ("sep_c1", 1e-6),
            ("sep_r2", 3.0),
            ("sep_c2", 1e-6),
            ("sep_r3", 5.0),
            ("sep_c3", 1e-6),
            ("sep_ra", 0.5),
            ("sep_ca", 1e-6),
            ("sep_rb", 0.25),
            ("sep_cb", 1e-6),
            ("r_an", 4.0),
            ("c_an", 1e-4),
            ("l_str", 1e-7),
            ("r_str", 0.2),
            ("r_ohm", 0.05),
        ])
    }

    /// Every parameter any named circuit reads.
    pub fn all_model_params() -> ParameterSet {
        let mut params = full_cell_params();
        params.insert("r", RC_R);
        params.insert("c", RC_C);
        params
    }

    /// Exact spectrum of a named circuit.
    pub fn model_spectrum(model: &dyn Model, params: &ParameterSet) -> ImpedanceSpectrum {
        let freqs = log_spaced_frequencies(0.01, 1e5, 60);
        let z = model.evaluate(params, &freqs).unwrap();
        ImpedanceSpectrum::new(freqs, z).unwrap()
    }
}
