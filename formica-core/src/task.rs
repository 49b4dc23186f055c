//! Resumable behavior scripts.
//!
//! A behavior is a directed graph of task nodes. A node is a template: its
//! start function turns an input into a live [`Task`], a state machine that
//! is stepped once per tick until it completes. The node's resolver then
//! maps the output to the next node to start. Graphs may be cyclic, so they
//! are built in two passes: declare every node, then wire resolvers.
//!
//! Node handles are typed (`NodeHandle<I, O>`), so a resolver for a node
//! producing `O` can only be registered as a closure taking `O`, and
//! `start` only accepts the node's input type. Internally values cross the
//! graph as `Box<dyn Any>`.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use log::trace;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<O> {
    Pending,
    Completed(O),
}

/// One live instance of a node, advanced by the executor once per call.
pub trait Task<C, E> {
    type Output: 'static;

    fn step(&mut self, ctx: &mut C) -> Result<Step<Self::Output>, E>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("next task resolver was not set for node '{0}'")]
    ResolverNotSet(&'static str),

    #[error("next task resolver already set for node '{0}'")]
    ResolverAlreadySet(&'static str),

    #[error("node {0} does not belong to this graph")]
    UnknownNode(usize),

    #[error("node '{0}' received an input of the wrong type")]
    InputTypeMismatch(&'static str),

    #[error("node '{0}' produced an output of the wrong type")]
    OutputTypeMismatch(&'static str),
}

/// Task built from a closure. Handy for small steps and tests.
pub struct FnTask<F, O> {
    f: F,
    _output: PhantomData<fn() -> O>,
}

pub fn from_fn<C, E, O, F>(f: F) -> FnTask<F, O>
where
    F: FnMut(&mut C) -> Result<Step<O>, E>,
{
    FnTask {
        f,
        _output: PhantomData,
    }
}

impl<C, E, O, F> Task<C, E> for FnTask<F, O>
where
    O: 'static,
    F: FnMut(&mut C) -> Result<Step<O>, E>,
{
    type Output = O;

    fn step(&mut self, ctx: &mut C) -> Result<Step<O>, E> {
        (self.f)(ctx)
    }
}

trait ErasedTask<C, E> {
    fn step_erased(&mut self, ctx: &mut C) -> Result<Step<Box<dyn Any>>, E>;
}

impl<C, E, T> ErasedTask<C, E> for T
where
    T: Task<C, E>,
{
    fn step_erased(&mut self, ctx: &mut C) -> Result<Step<Box<dyn Any>>, E> {
        Ok(match self.step(ctx)? {
            Step::Pending => Step::Pending,
            Step::Completed(output) => Step::Completed(Box::new(output)),
        })
    }
}

type StartFn<C, E> = Box<dyn Fn(Box<dyn Any>, &mut C) -> Result<Box<dyn ErasedTask<C, E>>, E>>;
type ResolveFn<C, E> = Box<dyn Fn(Box<dyn Any>, &mut C) -> Result<Start, E>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A request to start a node with a given input. Resolvers return one.
pub struct Start {
    node: NodeId,
    input: Box<dyn Any>,
}

impl Start {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl fmt::Debug for Start {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Start").field("node", &self.node).finish()
    }
}

/// Typed reference to a node taking `I` and producing `O`.
pub struct NodeHandle<I, O> {
    id: NodeId,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> Clone for NodeHandle<I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, O> Copy for NodeHandle<I, O> {}

impl<I: 'static, O> NodeHandle<I, O> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn start(&self, input: I) -> Start {
        Start {
            node: self.id,
            input: Box::new(input),
        }
    }

    pub fn entry(&self) -> Entry<I> {
        Entry {
            id: self.id,
            _input: PhantomData,
        }
    }

    pub fn exit(&self) -> Exit<O> {
        Exit {
            id: self.id,
            _output: PhantomData,
        }
    }
}

/// The input side of a node, used as the root of a [`SubGraph`].
pub struct Entry<I> {
    id: NodeId,
    _input: PhantomData<fn(I)>,
}

impl<I> Clone for Entry<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for Entry<I> {}

impl<I: 'static> Entry<I> {
    pub fn start(&self, input: I) -> Start {
        Start {
            node: self.id,
            input: Box::new(input),
        }
    }
}

/// The output side of a node, used as the terminal of a [`SubGraph`].
pub struct Exit<O> {
    id: NodeId,
    _output: PhantomData<fn() -> O>,
}

impl<O> Clone for Exit<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for Exit<O> {}

/// Anything a resolver can be attached to: a node or a sub-graph terminal.
pub trait Terminal {
    type Output: 'static;

    fn node_id(&self) -> NodeId;
}

impl<I, O: 'static> Terminal for NodeHandle<I, O> {
    type Output = O;

    fn node_id(&self) -> NodeId {
        self.id
    }
}

impl<O: 'static> Terminal for Exit<O> {
    type Output = O;

    fn node_id(&self) -> NodeId {
        self.id
    }
}

/// A reusable piece of a graph: start it through `root`, continue from
/// `terminal` by registering a resolver on it.
pub struct SubGraph<I, O> {
    pub root: Entry<I>,
    pub terminal: Exit<O>,
}

impl<I, O> Clone for SubGraph<I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, O> Copy for SubGraph<I, O> {}

struct Node<C, E> {
    name: &'static str,
    start: StartFn<C, E>,
    resolver: Option<ResolveFn<C, E>>,
}

pub struct GraphBuilder<C, E> {
    nodes: Vec<Node<C, E>>,
}

impl<C: 'static, E: From<TaskError> + 'static> Default for GraphBuilder<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static, E: From<TaskError> + 'static> GraphBuilder<C, E> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Declares a node. `start` runs every time the node is entered and
    /// builds a fresh task instance from the input.
    pub fn node<I, T, F>(&mut self, name: &'static str, start: F) -> NodeHandle<I, T::Output>
    where
        I: 'static,
        T: Task<C, E> + 'static,
        F: Fn(I, &mut C) -> Result<T, E> + 'static,
    {
        let id = NodeId(self.nodes.len());
        let start: StartFn<C, E> = Box::new(
            move |input: Box<dyn Any>, ctx: &mut C| -> Result<Box<dyn ErasedTask<C, E>>, E> {
                let input = input
                    .downcast::<I>()
                    .map_err(|_| TaskError::InputTypeMismatch(name))?;
                let task = start(*input, ctx)?;
                Ok(Box::new(task) as Box<dyn ErasedTask<C, E>>)
            },
        );
        self.nodes.push(Node {
            name,
            start,
            resolver: None,
        });
        NodeHandle {
            id,
            _types: PhantomData,
        }
    }

    /// Registers the transition taken when `from` completes. A node accepts
    /// exactly one resolver.
    pub fn then<T, R>(&mut self, from: T, resolver: R) -> Result<(), TaskError>
    where
        T: Terminal,
        R: Fn(T::Output, &mut C) -> Result<Start, E> + 'static,
    {
        let id = from.node_id();
        let node = self.nodes.get_mut(id.0).ok_or(TaskError::UnknownNode(id.0))?;
        if node.resolver.is_some() {
            return Err(TaskError::ResolverAlreadySet(node.name));
        }
        let name = node.name;
        node.resolver = Some(Box::new(
            move |output: Box<dyn Any>, ctx: &mut C| -> Result<Start, E> {
                let output = output
                    .downcast::<T::Output>()
                    .map_err(|_| TaskError::OutputTypeMismatch(name))?;
                resolver(*output, ctx)
            },
        ));
        Ok(())
    }

    /// Feeds the output of `from` straight into `to`.
    pub fn chain<T, P>(&mut self, from: T, to: NodeHandle<T::Output, P>) -> Result<(), TaskError>
    where
        T: Terminal,
        P: 'static,
    {
        self.then(from, move |output: T::Output, _: &mut C| Ok(to.start(output)))
    }

    pub fn build(self) -> TaskGraph<C, E> {
        TaskGraph { nodes: self.nodes }
    }
}

/// A finished graph. Owned by the executor that runs it.
pub struct TaskGraph<C, E> {
    nodes: Vec<Node<C, E>>,
}

impl<C, E: From<TaskError>> TaskGraph<C, E> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> Option<&'static str> {
        self.nodes.get(id.0).map(|node| node.name)
    }

    fn instantiate(&self, start: Start, ctx: &mut C) -> Result<Box<dyn ErasedTask<C, E>>, E> {
        let node = self
            .nodes
            .get(start.node.0)
            .ok_or(TaskError::UnknownNode(start.node.0))?;
        (node.start)(start.input, ctx)
    }
}

/// Result of one executor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Transitioned {
        from: &'static str,
        to: &'static str,
    },
}

/// Drives one graph, holding exactly one current task.
pub struct TaskGraphExecutor<C, E> {
    graph: TaskGraph<C, E>,
    current: Box<dyn ErasedTask<C, E>>,
    current_node: NodeId,
}

impl<C, E: From<TaskError>> TaskGraphExecutor<C, E> {
    pub fn new(graph: TaskGraph<C, E>, initial: Start, ctx: &mut C) -> Result<Self, E> {
        let current_node = initial.node;
        let current = graph.instantiate(initial, ctx)?;
        Ok(Self {
            graph,
            current,
            current_node,
        })
    }

    pub fn current(&self) -> &'static str {
        self.graph.name(self.current_node).unwrap_or("?")
    }

    /// Steps the current task once. On completion the node's resolver picks
    /// the successor, which is started immediately and becomes current.
    pub fn execute(&mut self, ctx: &mut C) -> Result<Progress, E> {
        let output = match self.current.step_erased(ctx)? {
            Step::Pending => return Ok(Progress::Pending),
            Step::Completed(output) => output,
        };

        let node = self
            .graph
            .nodes
            .get(self.current_node.0)
            .ok_or(TaskError::UnknownNode(self.current_node.0))?;
        let resolver = node
            .resolver
            .as_ref()
            .ok_or(TaskError::ResolverNotSet(node.name))?;
        let from = node.name;

        let next = resolver(output, ctx)?;
        let next_node = next.node;
        self.current = self.graph.instantiate(next, ctx)?;
        self.current_node = next_node;

        let to = self.current();
        trace!("{} -> {}", from, to);
        Ok(Progress::Transitioned { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Outcome<O> = Result<Step<O>, TaskError>;

    #[derive(Default)]
    struct Script {
        log: Vec<String>,
        multistep_visits: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Parity {
        Even,
        Odd,
    }

    fn done<O: 'static>(output: O) -> FnTask<impl FnMut(&mut Script) -> Outcome<O>, O> {
        let mut output = Some(output);
        from_fn(move |_: &mut Script| -> Outcome<O> {
            Ok(output.take().map_or(Step::Pending, Step::Completed))
        })
    }

    /// Three chained steps counting their own executions through the payload.
    fn counting_subgraph(builder: &mut GraphBuilder<Script, TaskError>) -> SubGraph<u32, u32> {
        let first = builder.node("subtask1", |input: u32, ctx: &mut Script| {
            ctx.log.push("initializing subtask1".into());
            ctx.log.push(format!("subtask1 input: {}", input));
            Ok(done(1u32))
        });
        let second = builder.node("subtask2", |count: u32, ctx: &mut Script| {
            ctx.log.push("initializing subtask2".into());
            Ok(done(count + 1))
        });
        let third = builder.node("subtask3", |count: u32, ctx: &mut Script| {
            ctx.log.push("initializing subtask3".into());
            let mut count = Some(count + 1);
            Ok(from_fn(move |ctx: &mut Script| -> Outcome<u32> {
                Ok(match count.take() {
                    Some(count) => {
                        ctx.log.push(format!("subtask3 output: {}", count));
                        Step::Completed(count)
                    }
                    None => Step::Pending,
                })
            }))
        });
        builder.chain(first, second).unwrap();
        builder.chain(second, third).unwrap();
        SubGraph {
            root: first.entry(),
            terminal: third.exit(),
        }
    }

    #[test]
    fn executes_graph_in_scripted_order() {
        let mut builder = GraphBuilder::<Script, TaskError>::new();

        let multistep = builder.node("multistep", |_: (), ctx: &mut Script| {
            ctx.log.push("initializing multistepTask".into());
            ctx.multistep_visits += 1;
            let mut steps_left = 2;
            Ok(from_fn(move |_: &mut Script| -> Outcome<()> {
                steps_left -= 1;
                Ok(if steps_left > 0 {
                    Step::Pending
                } else {
                    Step::Completed(())
                })
            }))
        });
        let many_outputs = builder.node("many outputs", |input: u32, ctx: &mut Script| {
            ctx.log.push("initializing manyOutsTask".into());
            let mut checked = false;
            Ok(from_fn(move |_: &mut Script| -> Outcome<Parity> {
                if !checked {
                    checked = true;
                    return Ok(Step::Pending);
                }
                Ok(Step::Completed(if input % 2 == 0 {
                    Parity::Even
                } else {
                    Parity::Odd
                }))
            }))
        });
        let composite = counting_subgraph(&mut builder);
        let after_composite = builder.node("after composite", |input: u32, ctx: &mut Script| {
            ctx.log.push("initializing afterCompositeTask".into());
            let mut input = Some(input);
            Ok(from_fn(move |ctx: &mut Script| -> Outcome<()> {
                if let Some(input) = input.take() {
                    ctx.log.push(format!("afterCompositeTask input: {}", input));
                }
                Ok(Step::Completed(()))
            }))
        });

        builder
            .then(multistep, move |_: (), ctx: &mut Script| {
                Ok(many_outputs.start(ctx.multistep_visits))
            })
            .unwrap();
        builder
            .then(many_outputs, move |parity: Parity, _: &mut Script| {
                Ok(match parity {
                    Parity::Even => multistep.start(()),
                    Parity::Odd => composite.root.start(2),
                })
            })
            .unwrap();
        builder.chain(composite.terminal, after_composite).unwrap();
        builder
            .then(after_composite, move |_: (), _: &mut Script| Ok(multistep.start(())))
            .unwrap();

        let mut script = Script::default();
        let graph = builder.build();
        let mut executor = TaskGraphExecutor::new(graph, multistep.start(()), &mut script).unwrap();
        while script.multistep_visits < 3 {
            executor.execute(&mut script).unwrap();
        }

        assert_eq!(
            script.log,
            vec![
                "initializing multistepTask",
                "initializing manyOutsTask",
                "initializing subtask1",
                "subtask1 input: 2",
                "initializing subtask2",
                "initializing subtask3",
                "subtask3 output: 3",
                "initializing afterCompositeTask",
                "afterCompositeTask input: 3",
                "initializing multistepTask",
                "initializing manyOutsTask",
                "initializing multistepTask",
            ]
        );
    }

    #[test]
    fn missing_resolver_fails_immediately() {
        let mut builder = GraphBuilder::<Script, TaskError>::new();
        let orphan = builder.node("orphan", |_: (), _: &mut Script| Ok(done(())));
        let mut script = Script::default();
        let mut executor =
            TaskGraphExecutor::new(builder.build(), orphan.start(()), &mut script).unwrap();

        assert_eq!(
            executor.execute(&mut script),
            Err(TaskError::ResolverNotSet("orphan"))
        );
    }

    #[test]
    fn second_resolver_is_rejected() {
        let mut builder = GraphBuilder::<Script, TaskError>::new();
        let node = builder.node("node", |_: (), _: &mut Script| Ok(done(())));
        builder
            .then(node, move |_: (), _: &mut Script| Ok(node.start(())))
            .unwrap();

        assert_eq!(
            builder.then(node, move |_: (), _: &mut Script| Ok(node.start(()))),
            Err(TaskError::ResolverAlreadySet("node"))
        );
    }

    #[test]
    fn restarting_a_node_yields_independent_instances() {
        let mut builder = GraphBuilder::<Script, TaskError>::new();
        // Each instance counts down from its own input and reports how long it ran.
        let countdown = builder.node("countdown", |from: u32, _: &mut Script| {
            let mut left = from;
            let mut steps = 0u32;
            Ok(from_fn(move |_: &mut Script| -> Outcome<u32> {
                steps += 1;
                if left == 0 {
                    return Ok(Step::Completed(steps));
                }
                left -= 1;
                Ok(Step::Pending)
            }))
        });
        builder
            .then(countdown, move |steps: u32, ctx: &mut Script| {
                ctx.log.push(format!("ran {}", steps));
                Ok(countdown.start(steps))
            })
            .unwrap();

        let mut script = Script::default();
        let mut executor =
            TaskGraphExecutor::new(builder.build(), countdown.start(1), &mut script).unwrap();
        let mut transitions = 0;
        while transitions < 3 {
            if let Progress::Transitioned { from, to } = executor.execute(&mut script).unwrap() {
                assert_eq!((from, to), ("countdown", "countdown"));
                transitions += 1;
            }
        }

        assert_eq!(script.log, vec!["ran 2", "ran 3", "ran 4"]);
    }

    #[test]
    fn pending_steps_do_not_transition() {
        let mut builder = GraphBuilder::<Script, TaskError>::new();
        let wait = builder.node("wait", |_: (), _: &mut Script| {
            Ok(from_fn(|_: &mut Script| -> Outcome<()> { Ok(Step::Pending) }))
        });
        let mut script = Script::default();
        let mut executor = TaskGraphExecutor::new(builder.build(), wait.start(()), &mut script).unwrap();
        for _ in 0..5 {
            assert_eq!(executor.execute(&mut script), Ok(Progress::Pending));
        }
        assert_eq!(executor.current(), "wait");
    }
}
