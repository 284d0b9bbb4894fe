//! Headless demo outfitter core
//!
//! Случайные (seeded) outfit swaps / add / remove с проверкой инвариантов каждый кадр

use bevy::time::TimeUpdateStrategy;
use outfitter_core::demo::{check_invariants, demo_step, spawn_demo_rig};
use outfitter_core::{create_headless_app, log_error, log_info, Wardrobe};
use std::time::Duration;

fn main() {
    let seed = 42;
    let mut app = create_headless_app(seed);
    // Фиксированный шаг 60Hz: прогоны одинаковы независимо от wall clock
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)));

    log_info(&format!("Starting outfitter headless demo (seed: {})", seed));
    let rig = spawn_demo_rig(&mut app);

    for tick in 0..1000 {
        demo_step(&mut app, &rig);

        let Some(wardrobe) = app.world().get_resource::<Wardrobe>() else {
            log_error("Wardrobe resource missing");
            return;
        };
        if let Err(violation) = check_invariants(wardrobe) {
            log_error(&format!("Tick {}: invariant violated: {}", tick, violation));
            std::process::exit(1);
        }

        if tick % 100 == 0 {
            let outfit = wardrobe.body(rig.body).and_then(|b| b.outfit());
            let persisted = wardrobe.body(rig.body).map(|b| b.accessories().len()).unwrap_or(0);
            log_info(&format!(
                "Tick {}: outfit {:?}, {} persisted accessories, coverage {}",
                tick,
                outfit,
                persisted,
                outfit.map(|o| wardrobe.outfit_coverage(o)).unwrap_or_default()
            ));
        }
    }

    log_info("Demo complete!");
}
