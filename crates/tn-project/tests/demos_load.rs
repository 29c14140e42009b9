use std::path::Path;
use tn_sim::run_sim;

#[test]
fn demos_load_and_run() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    let demos = ["cascade.yaml", "drain_closed.yaml", "linear_pulse.json"];

    for name in demos {
        let path = root.join(name);
        let project =
            tn_project::load(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e));
        let model = project
            .build_model()
            .unwrap_or_else(|e| panic!("Failed to build {}: {}", name, e));
        let schedule = project.schedule(model.tanks());
        let u0 = project.initial_state(&model);
        let rec = run_sim(&model, &u0, &schedule, &project.sim_options())
            .unwrap_or_else(|e| panic!("Failed to run {}: {}", name, e));
        assert!(rec.max_residual() <= 1e-10, "{name}: {}", rec.max_residual());
    }
}
