use criterion::*;
use sponge_core::commands::{ArgumentType, CommandBuilder, CommandCause, CommandDispatcher};
use sponge_core::commands::reader::StringReader;

fn dispatcher() -> CommandDispatcher {
    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register(
        CommandBuilder::literal("give").then(
            CommandBuilder::argument("target", ArgumentType::player()).then(
                CommandBuilder::argument("item", ArgumentType::word())
                    .executes(|_| Ok(1))
                    .then(
                        CommandBuilder::argument("amount", ArgumentType::integer_range(1, 64))
                            .executes(|ctx| ctx.get_integer("amount")),
                    ),
            ),
        ),
    );
    let give = dispatcher.find_node(&["give"]).unwrap();
    dispatcher.register_redirect("g", give);
    dispatcher
}

fn dispatch_parse(c: &mut Criterion) {
    let dispatcher = dispatcher();
    c.bench_function("dispatch-parse", move |b| {
        b.iter(|| {
            let parse = dispatcher.parse(black_box("g Steve diamond 32"), CommandCause::console());
            parse.reader.cursor()
        })
    });
}

fn dispatch_execute(c: &mut Criterion) {
    let dispatcher = dispatcher();
    c.bench_function("dispatch-execute", move |b| {
        b.iter(|| dispatcher.execute_input(black_box("give Steve diamond 32"), CommandCause::console()))
    });
}

fn dispatch_suggest(c: &mut Criterion) {
    let dispatcher = dispatcher();
    c.bench_function("dispatch-suggest", move |b| {
        b.iter(|| {
            let parse = dispatcher.parse(black_box("gi"), CommandCause::console());
            dispatcher.completion_suggestions(&parse, 2)
        })
    });
}

criterion_group!(dispatch, dispatch_parse, dispatch_execute, dispatch_suggest);
criterion_main!(dispatch);
