use tn_model::TankState;
use tn_sim::SimRecord;

/// Recorded levels as CSV: `time_s,volume_m3,h_<row>_<col>,...`.
pub fn levels_csv(model: &TankState, record: &SimRecord) -> String {
    let shape = model.shape();
    let mut csv = String::from("time_s,volume_m3");
    for idx in shape.iter() {
        csv.push_str(&format!(",h_{}_{}", idx.row, idx.col));
    }
    csv.push('\n');

    for ((t, volume), x) in record.t.iter().zip(&record.volume).zip(&record.x) {
        csv.push_str(&format!("{},{}", t, volume));
        for h in &x[..shape.tanks()] {
            csv.push_str(&format!(",{}", h));
        }
        csv.push('\n');
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use tn_model::TankConfig;
    use tn_sim::{ControlSchedule, SimOptions, run_sim};

    #[test]
    fn header_and_rows() {
        let cfg = TankConfig::default().with_grid(1, 2).with_time(1.0, 2);
        let model = TankState::new(&cfg).unwrap();
        let rec = run_sim(
            &model,
            &model.initial_state(),
            &ControlSchedule::zero(2),
            &SimOptions::default(),
        )
        .unwrap();
        let csv = levels_csv(&model, &rec);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "time_s,volume_m3,h_0_0,h_0_1");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("0,40,2,2"));
    }
}
