use crate::commands::{aggregate, explain, search, spellcheck};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "search",
            groups: search::EXAMPLES,
        },
        CommandExample {
            name: "aggregate",
            groups: aggregate::EXAMPLES,
        },
        CommandExample {
            name: "spellcheck",
            groups: spellcheck::EXAMPLES,
        },
        CommandExample {
            name: "explain",
            groups: explain::EXAMPLES,
        },
    ]
}
