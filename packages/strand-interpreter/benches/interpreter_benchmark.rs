use criterion::{Criterion, black_box, criterion_group, criterion_main};
use futures::task::LocalSpawn;
use std::cell::Cell;
use std::rc::Rc;
use strand_interpreter::{
    Effect, Error, ExecutionContext, Mutator, Resume, Sequence, Step, Value, ValueTask, from_fn,
    interpret,
};
use strand_scheduler::{LocalScheduler, Scheduler};

#[derive(Clone)]
struct BenchContext {
    state: Rc<Cell<u64>>,
    scheduler: Rc<LocalScheduler>,
}

impl ExecutionContext for BenchContext {
    type State = u64;
    type Dependencies = ();

    fn state(&self) -> u64 {
        self.state.get()
    }

    fn set_state(&self, mutator: Mutator<u64>) -> Option<u64> {
        let mut draft = self.state.get();
        let next = mutator(&mut draft).unwrap_or(draft);
        self.state.set(next);
        Some(next)
    }

    fn dependencies(&self) {}

    fn call(&self, sequence: &Sequence<Self>, event: Value) -> ValueTask {
        let task = interpret(self.clone(), sequence, event);
        task.run();
        task
    }

    fn spawner(&self) -> &dyn LocalSpawn {
        &*self.scheduler
    }
}

fn counting(steps: u64, effect: fn() -> Effect<BenchContext>) -> Sequence<BenchContext> {
    Sequence::new("bench", move |_| {
        let mut remaining = steps;
        from_fn(move |input| match input {
            Resume::Value(value) if remaining == 0 => Ok(Step::Done(value)),
            Resume::Value(_) => {
                remaining -= 1;
                Ok(Step::Yielded(effect()))
            }
            Resume::Error(error) => Err::<Step<BenchContext>, Error>(error),
        })
    })
}

fn interpreter_benchmark(c: &mut Criterion) {
    let context = BenchContext {
        state: Rc::new(Cell::new(0)),
        scheduler: Rc::new(LocalScheduler::new()),
    };

    let mutators = counting(1000, || Effect::update(|n: &mut u64| *n += 1));
    c.bench_function("interpret 1000 mutators", |b| {
        b.iter(|| {
            let task = interpret(context.clone(), &mutators, Value::unit());
            task.run();
            black_box(task.result());
        })
    });

    let futures = counting(1000, || Effect::future(async { Ok(Value::unit()) }));
    c.bench_function("interpret 1000 futures", |b| {
        b.iter(|| {
            let task = interpret(context.clone(), &futures, Value::unit());
            task.run();
            context.scheduler.run_until_stalled();
            black_box(task.result());
        })
    });
}

criterion_group!(benches, interpreter_benchmark);
criterion_main!(benches);
