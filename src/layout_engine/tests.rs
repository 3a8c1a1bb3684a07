use pretty_assertions::assert_eq;

use crate::layout_engine::{
    Balanced, DealStrategyKind, FirstFit, GreedyRows, LayoutEngine, LayoutStrategyKind,
    MaxMinArea, NearestSquareRows, RoundedRows, SquarestCells,
};
use crate::model::{GroupId, GroupRegistry, WindowEntry};
use crate::sys::geometry::Rect;
use crate::sys::window_server::{HeadlessWindowServer, WindowHandle, WindowServer};

fn all_engines() -> Vec<LayoutEngine> {
    let strategies: [LayoutStrategyKind; 4] =
        [GreedyRows.into(), RoundedRows.into(), NearestSquareRows.into(), SquarestCells.into()];
    let deals: [DealStrategyKind; 3] = [FirstFit.into(), MaxMinArea.into(), Balanced.into()];
    strategies
        .into_iter()
        .flat_map(|s| deals.into_iter().map(move |d| LayoutEngine::new(s, d)))
        .collect()
}

fn office() -> Vec<Rect> {
    vec![
        Rect::new(0.0, 0.0, 1920.0, 1080.0),
        Rect::new(1920.0, 0.0, 1280.0, 1024.0),
        Rect::new(-1080.0, 0.0, 1080.0, 1920.0),
    ]
}

fn entries(pins: &[u32]) -> Vec<WindowEntry> {
    pins.iter()
        .enumerate()
        .map(|(i, &pin)| WindowEntry::new(WindowHandle::new(i as u64 + 1), pin))
        .collect()
}

fn overlaps(a: Rect, b: Rect) -> bool { a.intersection(&b).area() > 0.0 }

#[test]
fn every_engine_places_each_window_once_inside_a_monitor() {
    let monitors = office();
    let pin_sets: [&[u32]; 4] =
        [&[0; 7], &[1, 0, 2, 0, 3, 0, 0, 1], &[3, 3, 3, 0], &[2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4]];

    for engine in all_engines() {
        for pins in pin_sets {
            let windows = entries(pins);
            let plan = engine.plan_group(&windows, &monitors);
            assert_eq!(plan.len(), windows.len(), "{engine:?} {pins:?}");

            let mut placed: Vec<WindowHandle> = plan.iter().map(|(h, _)| *h).collect();
            placed.sort();
            placed.dedup();
            assert_eq!(placed.len(), windows.len(), "{engine:?} {pins:?}");

            for (i, &(a, ra)) in plan.iter().enumerate() {
                assert!(
                    monitors.iter().any(|m| m.contains_rect(ra)),
                    "{engine:?} {pins:?}: {a} at {ra:?} is off screen"
                );
                for &(b, rb) in &plan[i + 1..] {
                    assert!(!overlaps(ra, rb), "{engine:?} {pins:?}: {a} and {b} overlap");
                }
            }
        }
    }
}

#[test]
fn pinned_windows_stay_on_their_monitor() {
    let monitors = office();
    let windows = entries(&[1, 0, 2, 0, 3, 0, 0, 2]);
    for engine in all_engines() {
        let plan = engine.plan_group(&windows, &monitors);
        for window in windows.iter().filter(|w| w.pinned_monitor > 0) {
            let (_, rect) = plan.iter().find(|(h, _)| *h == window.handle).unwrap();
            let monitor = monitors[window.pinned_monitor as usize - 1];
            assert!(monitor.contains_rect(*rect), "{engine:?}: {window:?} at {rect:?}");
        }
    }
}

#[test]
fn registry_groups_lay_out_independently() {
    let monitors = vec![Rect::new(0.0, 0.0, 1000.0, 1000.0), Rect::new(1000.0, 0.0, 1000.0, 1000.0)];
    let mut server = HeadlessWindowServer::new();
    let mut registry = GroupRegistry::new();
    let work = GroupId::Name("work".into());
    for _ in 0..4 {
        let handle = server.create_window(None).unwrap();
        registry.add_window(&work, WindowEntry::new(handle, 0));
    }
    let loner = server.create_window(None).unwrap();
    registry.add_window(&GroupId::Number(1), WindowEntry::new(loner, 0));

    let engine = LayoutEngine::default();
    let work_plan = engine.layout_group(registry.members(&work), &monitors, false, &mut server);
    let loner_plan =
        engine.layout_group(registry.members(&GroupId::Number(1)), &monitors, false, &mut server);

    let on_first = work_plan.iter().filter(|(_, r)| r.x < 1000.0).count();
    assert_eq!(on_first, 2);
    // A group of one takes a whole monitor regardless of other groups. Equal
    // deals resolve to the earliest table row, which leaves monitor 1 empty.
    assert_eq!(loner_plan, vec![(loner, Rect::new(1000.0, 0.0, 1000.0, 1000.0))]);
    assert_eq!(server.frame(loner), Some(Rect::new(1000.0, 0.0, 1000.0, 1000.0)));
}
