#![allow(dead_code)]

pub mod recorder {
    use parking_lot::Mutex;

    /// Collects labelled events from middleware and targets, in call order.
    #[derive(Default)]
    pub struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        pub fn push(&self, event: impl Into<String>) {
            self.events.lock().push(event.into());
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }
}

pub mod fixtures {
    use std::sync::Arc;

    use brrtwire::container::{instance, Container, Function, Instance, Param};
    use brrtwire::router::{Next, Router};

    use super::recorder::Recorder;

    /// Binding name of the shared [`Recorder`] in test containers.
    pub const RECORDER: &str = "recorder";

    pub fn unit() -> Instance {
        instance(())
    }

    /// A container with a shared recorder bound under [`RECORDER`].
    pub fn recording_container() -> Container {
        let mut container = Container::new();
        container
            .instance(RECORDER, Recorder::default())
            .unwrap();
        container
    }

    pub fn recorder(container: &Container) -> Arc<Recorder> {
        container.invoke_as::<Recorder>(RECORDER).unwrap()
    }

    pub fn router() -> Router {
        Router::new(Arc::new(Container::new()))
    }

    /// Function middleware recording `"<label> entered"` / `"<label> resumed"`.
    /// The recorder is injected by type.
    pub fn recording_middleware(label: &'static str, calls_next: bool) -> Function {
        Function::new(
            [
                Param::untyped("request"),
                Param::untyped("response"),
                Param::untyped("next"),
                Param::typed("recorder", RECORDER),
            ],
            move |args| {
                let recorder = args.get::<Recorder>(3)?;
                recorder.push(format!("{label} entered"));
                let result = if calls_next {
                    let next = args.get::<Next>(2)?;
                    next.run(Arc::clone(args.raw(0)?), Arc::clone(args.raw(1)?))?
                } else {
                    instance("short-circuited")
                };
                recorder.push(format!("{label} resumed"));
                Ok(result)
            },
        )
    }

    /// Function target recording `"<label> executed"` and returning `label`.
    pub fn recording_target(label: &'static str) -> Function {
        Function::new([Param::typed("recorder", RECORDER)], move |args| {
            args.get::<Recorder>(0)?.push(format!("{label} executed"));
            Ok(instance(label))
        })
    }
}
