use criterion::{Criterion, black_box, criterion_group, criterion_main};
use futures::channel::oneshot;
use futures::task::LocalSpawnExt;
use strand_scheduler::{LocalScheduler, Scheduler};

fn benchmark_ready_futures(c: &mut Criterion) {
    c.bench_function("spawn_local ready 1000", |b| {
        b.iter(|| {
            let scheduler = LocalScheduler::new();
            for _ in 0..1000 {
                scheduler
                    .spawn_local(async {
                        black_box(1 + 1);
                    })
                    .unwrap();
            }
            scheduler.run_until_stalled();
        })
    });
}

fn benchmark_woken_futures(c: &mut Criterion) {
    c.bench_function("spawn_local woken 1000", |b| {
        b.iter(|| {
            let scheduler = LocalScheduler::new();
            let mut senders = Vec::with_capacity(1000);
            for _ in 0..1000 {
                let (sender, receiver) = oneshot::channel::<u32>();
                senders.push(sender);
                scheduler
                    .spawn_local(async move {
                        black_box(receiver.await.ok());
                    })
                    .unwrap();
            }
            scheduler.run_until_stalled();
            for sender in senders {
                let _ = sender.send(1);
            }
            scheduler.run_until_stalled();
        })
    });
}

criterion_group!(benches, benchmark_ready_futures, benchmark_woken_futures);
criterion_main!(benches);
