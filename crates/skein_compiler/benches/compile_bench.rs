//! Benchmark harness for the skein compiler.
//!
//! Uses criterion for reliable benchmarking.
//! Run with: cargo bench -p skein_compiler

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skein_compiler::compile;
use skein_nodebuilder::StoryBuilder;

/// A branching story with converging assignments and a register read,
/// the shape that exercises every pipeline stage.
fn branching_story() -> StoryBuilder {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "stormy"]);
    let intro = b.text("you reach the crossroads");
    let intro_show = b.show(intro);
    let bridge = b.text("take the bridge");
    let ford = b.text("take the ford");
    let back = b.text("turn back");
    let set_calm = b.set("mood", "calm");
    let set_stormy = b.set("mood", "stormy");
    let onward = b.switch_arm(vec![bridge, ford], vec![set_calm]);
    let homeward = b.switch_arm(vec![back], vec![set_stormy]);
    let switch = b.switch_arms(vec![onward, homeward]);
    let calm_line = b.text("the river sings you onward");
    let calm_show = b.show(calm_line);
    let stormy_line = b.text("thunder follows you home");
    let stormy_show = b.show(stormy_line);
    let calm_arm = b.arm(&["calm"], vec![calm_show]);
    let stormy_arm = b.arm(&["stormy"], vec![stormy_show]);
    let branch = b.branch("mood", vec![calm_arm, stormy_arm]);
    b.chapter("crossroads", vec![intro_show, switch, branch]);
    b
}

/// A long linear scene, the degenerate shape dominated by `append`.
fn linear_story(len: usize) -> StoryBuilder {
    let b = StoryBuilder::new();
    let body = (0..len)
        .map(|i| {
            let line = b.text(&format!("line {i}"));
            b.show(line)
        })
        .collect();
    b.chapter("long_road", body);
    b
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_branching_story", |bencher| {
        bencher.iter(|| {
            let (module, interner) = branching_story().finish();
            black_box(compile(module, interner))
        })
    });

    c.bench_function("compile_linear_100", |bencher| {
        bencher.iter(|| {
            let (module, interner) = linear_story(100).finish();
            black_box(compile(module, interner))
        })
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
