//! Parsed contract ABI descriptor.
//!
//! A [`Descriptor`] is built once from a contract's JSON ABI and then shared
//! read-only. Construction resolves every parameter type, assigns each
//! function and event a unique binding name and checks that selectors and
//! event topics don't collide.
//!
//! # Binding names
//!
//! Solidity allows overloading, so the plain name doesn't identify a function.
//! Entries are visited in ABI document order: the first entry with a given
//! name keeps it, every later overload gets the smallest numeric suffix
//! (`0`, `1`, ...) that is neither a Solidity name declared in the ABI nor an
//! already assigned binding name. `diss(address[])` followed by
//! `diss(address)` bind as `diss` and `diss0`. Functions and events are named
//! independently.

use std::collections::{HashMap, HashSet};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{self, Constructor, Event, Fallback, Function, Receive, StateMutability},
    primitives::{B256, Bytes, LogData, Selector},
    rpc::types::Log,
};
use alloy_sol_types::{Panic, Revert, SolError};
use itertools::Itertools;

use crate::{
    error::{Error, Result, RevertReason},
    event::DecodedEvent,
    value::{self, CallOutput},
};

/// Error in the descriptor itself, detected at construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("malformed ABI JSON: {0}")]
    Json(String),

    #[error("unsupported ABI entry type: {0}")]
    UnsupportedEntry(String),

    #[error("unresolvable type in {item}: {reason}")]
    UnresolvedType { item: String, reason: String },

    #[error("duplicate function selector {selector}: {first} and {second}")]
    DuplicateSelector {
        selector: Selector,
        first: String,
        second: String,
    },

    #[error("duplicate event topic {topic}: {first} and {second}")]
    DuplicateTopic {
        topic: B256,
        first: String,
        second: String,
    },

    #[error("event {event} needs {topics} topics, logs carry at most 4")]
    TooManyTopics { event: String, topics: usize },
}

/// Topics a log can carry.
pub const MAX_TOPICS: usize = 4;

impl From<serde_json::Error> for DescriptorError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

/// Function of a contract along with its resolved types.
#[derive(Clone, Debug)]
pub struct FunctionEntry {
    binding_name: String,
    function: Function,
    selector: Selector,
    inputs: Vec<DynSolType>,
    outputs: Vec<DynSolType>,
}

/// Event of a contract along with its resolved types.
#[derive(Clone, Debug)]
pub struct EventEntry {
    binding_name: String,
    event: Event,
    topic: B256,
    indexed: Vec<DynSolType>,
    body: Vec<DynSolType>,
}

/// Parsed and validated contract ABI.
#[derive(Clone, Debug, Default)]
pub struct Descriptor {
    constructor: Option<Constructor>,
    fallback: Option<Fallback>,
    receive: Option<Receive>,
    functions: Vec<FunctionEntry>,
    events: Vec<EventEntry>,
    errors: Vec<json_abi::Error>,
    function_index: HashMap<String, usize>,
    event_index: HashMap<String, usize>,
    topic_index: HashMap<B256, usize>,
}

impl Descriptor {
    /// Parses JSON ABI, e.g. the `abi` array of a solc/truffle artifact.
    pub fn from_json(json: &str) -> std::result::Result<Self, DescriptorError> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;

        let mut constructor = None;
        let mut fallback = None;
        let mut receive = None;
        let mut functions = Vec::new();
        let mut events = Vec::new();
        let mut errors = Vec::new();

        for entry in entries {
            // Entries without explicit type are functions
            let kind = entry
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("function")
                .to_string();
            match kind.as_str() {
                "function" => functions.push(serde_json::from_value::<Function>(entry)?),
                "event" => events.push(serde_json::from_value::<Event>(entry)?),
                "error" => errors.push(serde_json::from_value::<json_abi::Error>(entry)?),
                "constructor" => constructor = Some(serde_json::from_value(entry)?),
                "fallback" => fallback = Some(serde_json::from_value(entry)?),
                "receive" => receive = Some(serde_json::from_value(entry)?),
                _ => return Err(DescriptorError::UnsupportedEntry(kind)),
            }
        }

        Self::new(constructor, fallback, receive, functions, events, errors)
    }

    fn new(
        constructor: Option<Constructor>,
        fallback: Option<Fallback>,
        receive: Option<Receive>,
        functions: Vec<Function>,
        events: Vec<Event>,
        errors: Vec<json_abi::Error>,
    ) -> std::result::Result<Self, DescriptorError> {
        let function_names = binding_names(functions.iter().map(|f| f.name.as_str()));
        let event_names = binding_names(events.iter().map(|e| e.name.as_str()));

        let functions = functions
            .into_iter()
            .zip(function_names)
            .map(|(function, binding_name)| FunctionEntry::new(binding_name, function))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let events = events
            .into_iter()
            .zip(event_names)
            .map(|(event, binding_name)| EventEntry::new(binding_name, event))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut selectors: HashMap<Selector, usize> = HashMap::new();
        for (idx, f) in functions.iter().enumerate() {
            if let Some(prev) = selectors.insert(f.selector, idx) {
                return Err(DescriptorError::DuplicateSelector {
                    selector: f.selector,
                    first: functions[prev].signature(),
                    second: f.signature(),
                });
            }
        }

        let mut topic_index = HashMap::new();
        for (idx, e) in events.iter().enumerate() {
            // Anonymous events are never matched by topic
            if e.is_anonymous() {
                continue;
            }
            if let Some(prev) = topic_index.insert(e.topic, idx) {
                return Err(DescriptorError::DuplicateTopic {
                    topic: e.topic,
                    first: events[prev].signature(),
                    second: e.signature(),
                });
            }
        }

        Ok(Self {
            constructor,
            fallback,
            receive,
            function_index: functions
                .iter()
                .enumerate()
                .map(|(idx, f)| (f.binding_name.clone(), idx))
                .collect(),
            event_index: events
                .iter()
                .enumerate()
                .map(|(idx, e)| (e.binding_name.clone(), idx))
                .collect(),
            topic_index,
            functions,
            events,
            errors,
        })
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    pub fn receive(&self) -> Option<&Receive> {
        self.receive.as_ref()
    }

    /// Functions in ABI document order.
    pub fn functions(&self) -> &[FunctionEntry] {
        &self.functions
    }

    /// Events in ABI document order.
    pub fn events(&self) -> &[EventEntry] {
        &self.events
    }

    /// Custom errors declared by the contract.
    pub fn errors(&self) -> &[json_abi::Error] {
        &self.errors
    }

    /// Function by its binding name.
    pub fn function(&self, binding_name: &str) -> Option<&FunctionEntry> {
        self.function_index
            .get(binding_name)
            .map(|&idx| &self.functions[idx])
    }

    /// Event by its binding name.
    pub fn event(&self, binding_name: &str) -> Option<&EventEntry> {
        self.event_index
            .get(binding_name)
            .map(|&idx| &self.events[idx])
    }

    /// Non-anonymous event by its topic hash.
    pub fn event_by_topic(&self, topic: &B256) -> Option<&EventEntry> {
        self.topic_index.get(topic).map(|&idx| &self.events[idx])
    }

    /// Picks the function to invoke for the given name and arguments.
    ///
    /// A suffixed binding name (`diss0`) selects the overload directly. A plain
    /// Solidity name of an overloaded function is narrowed down by arity first,
    /// then by argument types.
    pub fn resolve_function(&self, name: &str, args: &[DynSolValue]) -> Result<&FunctionEntry> {
        let overloads = self
            .functions
            .iter()
            .filter(|f| f.name() == name)
            .collect::<Vec<_>>();

        if overloads.len() <= 1 {
            return self
                .function(name)
                .ok_or_else(|| Error::UnknownFunction(name.to_string()));
        }

        let same_arity = overloads
            .into_iter()
            .filter(|f| f.inputs.len() == args.len())
            .collect::<Vec<_>>();
        match same_arity.as_slice() {
            [] => Err(Error::Encoding(format!(
                "no overload of {name} takes {} argument(s)",
                args.len()
            ))),
            [single] => Ok(single),
            candidates => candidates
                .iter()
                .find(|f| f.accepts(args))
                .copied()
                .ok_or_else(|| {
                    Error::Encoding(format!("no overload of {name} accepts the arguments"))
                }),
        }
    }

    /// Decodes revert data returned by the contract.
    pub fn decode_revert(&self, data: &[u8]) -> RevertReason {
        if data.is_empty() {
            return RevertReason::Unknown;
        }
        if let Ok(revert) = Revert::abi_decode(data) {
            return RevertReason::Message(revert.reason);
        }
        if let Ok(panic) = Panic::abi_decode(data) {
            return RevertReason::Panic(panic.code);
        }
        if data.len() >= 4 {
            let known = self
                .errors
                .iter()
                .filter(|e| e.selector().as_slice() == &data[..4])
                .find_map(|e| {
                    e.abi_decode_input(&data[4..])
                        .ok()
                        .map(|args| RevertReason::Custom {
                            name: e.name.clone(),
                            args,
                        })
                });
            if let Some(known) = known {
                return known;
            }
        }
        RevertReason::Raw(Bytes::copy_from_slice(data))
    }

    /// Decodes a log with whichever event its first topic identifies.
    pub fn decode_any_log(&self, log: Log) -> Result<DecodedEvent> {
        let topic = log
            .topics()
            .first()
            .copied()
            .ok_or_else(|| Error::Decoding("log has no topics".to_string()))?;
        let entry = self
            .event_by_topic(&topic)
            .ok_or_else(|| Error::UnknownEvent(topic.to_string()))?;
        entry.decode_log(log)
    }
}

/// Assigns binding names, see the module docs.
fn binding_names<'a>(names: impl Iterator<Item = &'a str> + Clone) -> Vec<String> {
    let declared: HashSet<&str> = names.clone().collect();
    let mut taken: HashSet<String> = HashSet::new();
    names
        .map(|name| {
            let binding = if taken.contains(name) {
                (0..)
                    .map(|idx| format!("{name}{idx}"))
                    .find(|candidate| {
                        !declared.contains(candidate.as_str()) && !taken.contains(candidate)
                    })
                    .unwrap_or_default()
            } else {
                name.to_string()
            };
            taken.insert(binding.clone());
            binding
        })
        .collect()
}

fn resolve_all<'a, S>(
    item: &str,
    params: impl IntoIterator<Item = &'a S>,
) -> std::result::Result<Vec<DynSolType>, DescriptorError>
where
    S: Specifier<DynSolType> + 'a,
{
    params
        .into_iter()
        .map(|p| {
            p.resolve().map_err(|err| DescriptorError::UnresolvedType {
                item: item.to_string(),
                reason: err.to_string(),
            })
        })
        .collect()
}

impl FunctionEntry {
    fn new(binding_name: String, function: Function) -> std::result::Result<Self, DescriptorError> {
        let signature = function.signature();
        Ok(Self {
            inputs: resolve_all(&signature, &function.inputs)?,
            outputs: resolve_all(&signature, &function.outputs)?,
            selector: function.selector(),
            binding_name,
            function,
        })
    }

    /// Unique name of the function within the contract.
    pub fn binding_name(&self) -> &str {
        &self.binding_name
    }

    /// Solidity name, shared by all overloads.
    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        self.function.signature()
    }

    pub fn state_mutability(&self) -> StateMutability {
        self.function.state_mutability
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self.function.state_mutability,
            StateMutability::Pure | StateMutability::View
        )
    }

    pub fn is_payable(&self) -> bool {
        self.function.state_mutability == StateMutability::Payable
    }

    pub fn input_types(&self) -> &[DynSolType] {
        &self.inputs
    }

    pub fn output_types(&self) -> &[DynSolType] {
        &self.outputs
    }

    pub fn abi(&self) -> &Function {
        &self.function
    }

    fn accepts(&self, args: &[DynSolValue]) -> bool {
        self.inputs.len() == args.len()
            && self.inputs.iter().zip(args).all(|(ty, arg)| ty.matches(arg))
    }

    /// Selector followed by the tuple-encoded arguments.
    pub fn encode_input(&self, args: &[DynSolValue]) -> Result<Vec<u8>> {
        if args.len() != self.inputs.len() {
            return Err(Error::Encoding(format!(
                "{} expects {} argument(s), got {}",
                self.signature(),
                self.inputs.len(),
                args.len()
            )));
        }
        for (idx, (ty, arg)) in self.inputs.iter().zip(args).enumerate() {
            if !ty.matches(arg) {
                return Err(Error::Encoding(format!(
                    "argument {idx} ({}) of {}: expected {ty}, got {}",
                    self.function.inputs[idx].name,
                    self.signature(),
                    value::type_name(arg),
                )));
            }
        }
        let mut calldata = self.selector.to_vec();
        calldata.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
        Ok(calldata)
    }

    /// Decodes calldata (selector included) back into arguments.
    pub fn decode_input(&self, calldata: &[u8]) -> Result<Vec<DynSolValue>> {
        match calldata.split_first_chunk::<4>() {
            Some((selector, params)) if selector == self.selector.as_slice() => {
                value::decode_params(&self.inputs, params)
            }
            Some(_) => Err(Error::Decoding(format!(
                "calldata is not a call of {}",
                self.signature()
            ))),
            None => Err(Error::Decoding("calldata shorter than a selector".to_string())),
        }
    }

    /// Decodes returned data into named outputs.
    pub fn decode_output(&self, data: &[u8]) -> Result<CallOutput> {
        let values = value::decode_params(&self.outputs, data)?;
        Ok(CallOutput::new(
            self.function
                .outputs
                .iter()
                .map(|p| p.name.clone())
                .zip(values)
                .collect(),
        ))
    }
}

impl EventEntry {
    fn new(binding_name: String, event: Event) -> std::result::Result<Self, DescriptorError> {
        let signature = event.signature();
        let topics =
            usize::from(!event.anonymous) + event.inputs.iter().filter(|p| p.indexed).count();
        if topics > MAX_TOPICS {
            return Err(DescriptorError::TooManyTopics {
                event: signature,
                topics,
            });
        }
        Ok(Self {
            indexed: resolve_all(&signature, event.inputs.iter().filter(|p| p.indexed))?,
            body: resolve_all(&signature, event.inputs.iter().filter(|p| !p.indexed))?,
            topic: event.selector(),
            binding_name,
            event,
        })
    }

    /// Unique name of the event within the contract.
    pub fn binding_name(&self) -> &str {
        &self.binding_name
    }

    pub fn name(&self) -> &str {
        &self.event.name
    }

    /// Keccak-256 hash of the canonical signature.
    pub fn topic(&self) -> B256 {
        self.topic
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub fn signature(&self) -> String {
        self.event.signature()
    }

    pub fn is_anonymous(&self) -> bool {
        self.event.anonymous
    }

    /// Types of the indexed parameters in declaration order.
    pub fn indexed_types(&self) -> &[DynSolType] {
        &self.indexed
    }

    pub fn abi(&self) -> &Event {
        &self.event
    }

    fn topic_count(&self) -> usize {
        self.indexed.len() + usize::from(!self.event.anonymous)
    }

    /// Builds log data for the given field values in declaration order.
    pub fn encode_log(&self, values: &[DynSolValue]) -> Result<LogData> {
        if values.len() != self.event.inputs.len() {
            return Err(Error::Encoding(format!(
                "{} has {} field(s), got {}",
                self.signature(),
                self.event.inputs.len(),
                values.len()
            )));
        }

        let mut topics = Vec::with_capacity(self.topic_count());
        if !self.event.anonymous {
            topics.push(self.topic);
        }
        let mut indexed = self.indexed.iter();
        let mut body = Vec::with_capacity(self.body.len());
        for (param, value) in self.event.inputs.iter().zip(values) {
            if param.indexed {
                let ty = indexed.next().ok_or_else(|| {
                    Error::Encoding(format!("indexed type missing for {}", param.name))
                })?;
                topics.push(value::topic(ty, value)?);
            } else {
                body.push(value.clone());
            }
        }
        for (idx, (ty, value)) in self.body.iter().zip(&body).enumerate() {
            if !ty.matches(value) {
                return Err(Error::Encoding(format!(
                    "data field {idx} of {}: expected {ty}, got {}",
                    self.signature(),
                    value::type_name(value)
                )));
            }
        }

        LogData::new(topics, DynSolValue::Tuple(body).abi_encode_params().into())
            .ok_or_else(|| Error::Encoding("log can hold at most 4 topics".to_string()))
    }

    /// Decodes a raw log into named fields in declaration order.
    ///
    /// Indexed values of reference types (`string`, `bytes`, arrays, tuples)
    /// are stored as their hash, so they decode as `bytes32`.
    pub fn decode_log(&self, log: Log) -> Result<DecodedEvent> {
        let data = &log.inner.data;
        let topics = data.topics();
        if topics.len() != self.topic_count() {
            return Err(Error::Decoding(format!(
                "{} expects {} topic(s), log has {}",
                self.signature(),
                self.topic_count(),
                topics.len()
            )));
        }
        let indexed_topics = if self.event.anonymous {
            topics
        } else {
            if topics[0] != self.topic {
                return Err(Error::Decoding(format!(
                    "log topic {} does not match {}",
                    topics[0],
                    self.signature()
                )));
            }
            &topics[1..]
        };

        let mut indexed = self
            .indexed
            .iter()
            .zip(indexed_topics)
            .map(|(ty, word)| value::from_topic(ty, word))
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        let mut body = value::decode_params(&self.body, &data.data)?.into_iter();

        let fields = self
            .event
            .inputs
            .iter()
            .map(|p| {
                let value = if p.indexed {
                    indexed.next()
                } else {
                    body.next()
                };
                value
                    .map(|v| (p.name.clone(), v))
                    .ok_or_else(|| Error::Decoding(format!("missing value for {}", p.name)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DecodedEvent::new(self.binding_name.clone(), fields, log))
    }

    /// Human readable event declaration, e.g.
    /// `Transfer(address indexed from, address indexed to, uint256 value)`.
    pub fn declaration(&self) -> String {
        format!(
            "{}({})",
            self.event.name,
            self.event
                .inputs
                .iter()
                .map(|p| {
                    let ty = p.selector_type();
                    match (p.indexed, p.name.is_empty()) {
                        (true, true) => format!("{ty} indexed"),
                        (true, false) => format!("{ty} indexed {}", p.name),
                        (false, true) => ty.to_string(),
                        (false, false) => format!("{ty} {}", p.name),
                    }
                })
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256, address, hex};

    use super::*;

    const OVERLOADED: &str = r#"[
        {"type":"function","name":"diss","inputs":[{"name":"readers","type":"address[]"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"diss","inputs":[{"name":"reader","type":"address"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"diss0","inputs":[],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"diss","inputs":[{"name":"a","type":"uint256"},{"name":"b","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"poke","inputs":[{"name":"val","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"poke","inputs":[{"name":"who","type":"address"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"error","name":"NotReader","inputs":[{"name":"who","type":"address"},{"name":"code","type":"uint8"}]}
    ]"#;

    #[test]
    fn test_binding_names_for_overloads() {
        let descriptor = Descriptor::from_json(OVERLOADED).unwrap();
        let names = descriptor
            .functions()
            .iter()
            .map(|f| f.binding_name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["diss", "diss1", "diss0", "diss2", "poke", "poke0"]);

        assert_eq!(descriptor.function("diss").unwrap().signature(), "diss(address[])");
        assert_eq!(descriptor.function("diss1").unwrap().signature(), "diss(address)");
        assert_eq!(descriptor.function("diss0").unwrap().signature(), "diss0()");
    }

    #[test]
    fn test_binding_names_are_deterministic() {
        let first = binding_names(["a", "b", "a", "a", "b"].into_iter());
        let second = binding_names(["a", "b", "a", "a", "b"].into_iter());
        assert_eq!(first, vec!["a", "b", "a0", "a1", "b0"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_overloads_by_arity_and_type() {
        let descriptor = Descriptor::from_json(OVERLOADED).unwrap();
        let reader = DynSolValue::Address(address!("0x00000000000000000000000000000000000000aa"));

        let single = descriptor.resolve_function("diss", &[reader.clone()]).unwrap();
        assert_eq!(single.signature(), "diss(address)");

        let many = descriptor
            .resolve_function("diss", &[DynSolValue::Array(vec![reader.clone()])])
            .unwrap();
        assert_eq!(many.signature(), "diss(address[])");

        let two = descriptor
            .resolve_function(
                "diss",
                &[
                    DynSolValue::Uint(U256::from(1), 256),
                    DynSolValue::Uint(U256::from(2), 256),
                ],
            )
            .unwrap();
        assert_eq!(two.binding_name(), "diss2");

        let by_binding_name = descriptor.resolve_function("diss1", &[reader.clone()]).unwrap();
        assert_eq!(by_binding_name.signature(), "diss(address)");

        let poke = descriptor
            .resolve_function("poke", &[DynSolValue::Uint(U256::from(7), 256)])
            .unwrap();
        assert_eq!(poke.signature(), "poke(uint256)");

        assert!(matches!(
            descriptor.resolve_function("poke", &[DynSolValue::Bool(true)]),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            descriptor.resolve_function("diss", &[]),
            Err(Error::Encoding(_))
        ));
        assert!(matches!(
            descriptor.resolve_function("lift", &[]),
            Err(Error::UnknownFunction(ref name)) if name == "lift"
        ));
    }

    #[test]
    fn test_duplicate_selector_rejected() {
        let json = r#"[
            {"type":"function","name":"bar","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
            {"type":"function","name":"bar","inputs":[],"outputs":[],"stateMutability":"nonpayable"}
        ]"#;
        assert!(matches!(
            Descriptor::from_json(json),
            Err(DescriptorError::DuplicateSelector { ref first, ref second, .. })
                if first == "bar()" && second == "bar()"
        ));
    }

    #[test]
    fn test_duplicate_topic_rejected() {
        let json = r#"[
            {"type":"event","name":"LogIndex","inputs":[{"name":"index","type":"bytes32","indexed":false}],"anonymous":false},
            {"type":"event","name":"LogIndex","inputs":[{"name":"other","type":"bytes32","indexed":true}],"anonymous":false}
        ]"#;
        assert!(matches!(
            Descriptor::from_json(json),
            Err(DescriptorError::DuplicateTopic { .. })
        ));
    }

    #[test]
    fn test_too_many_topics_rejected() {
        let four = r#"[
            {"type":"event","name":"Four","anonymous":false,"inputs":[
                {"name":"a","type":"uint256","indexed":true},
                {"name":"b","type":"uint256","indexed":true},
                {"name":"c","type":"uint256","indexed":true},
                {"name":"d","type":"uint256","indexed":true}]}
        ]"#;
        assert_eq!(
            Descriptor::from_json(four).unwrap_err(),
            DescriptorError::TooManyTopics {
                event: "Four(uint256,uint256,uint256,uint256)".to_string(),
                topics: 5,
            }
        );

        // Anonymous events may use all four topics
        let anonymous = four.replace(r#""anonymous":false"#, r#""anonymous":true"#);
        let descriptor = Descriptor::from_json(&anonymous).unwrap();
        assert_eq!(descriptor.event("Four").unwrap().indexed_types().len(), 4);

        let five = anonymous.replace(
            r#"{"name":"d","type":"uint256","indexed":true}"#,
            r#"{"name":"d","type":"uint256","indexed":true},
                {"name":"e","type":"uint256","indexed":true}"#,
        );
        assert!(matches!(
            Descriptor::from_json(&five),
            Err(DescriptorError::TooManyTopics { topics: 5, .. })
        ));
    }

    #[test]
    fn test_malformed_descriptor() {
        assert!(matches!(
            Descriptor::from_json("{\"not\":\"an array\"}"),
            Err(DescriptorError::Json(_))
        ));
        assert!(matches!(
            Descriptor::from_json(
                r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"uint7"}],"outputs":[],"stateMutability":"view"}]"#
            ),
            Err(DescriptorError::UnresolvedType { .. } | DescriptorError::Json(_))
        ));
        assert!(matches!(
            Descriptor::from_json(r#"[{"type":"modifier","name":"onlyOwner"}]"#),
            Err(DescriptorError::UnsupportedEntry(ref kind)) if kind == "modifier"
        ));
    }

    #[test]
    fn test_decode_revert() {
        let descriptor = Descriptor::from_json(OVERLOADED).unwrap();

        let message = Revert::from("Ownable: caller is not the owner").abi_encode();
        assert_eq!(
            descriptor.decode_revert(&message),
            RevertReason::Message("Ownable: caller is not the owner".to_string())
        );

        let panic = Panic {
            code: U256::from(0x11),
        }
        .abi_encode();
        assert_eq!(
            descriptor.decode_revert(&panic),
            RevertReason::Panic(U256::from(0x11))
        );

        let who = address!("0x00000000000000000000000000000000000000bb");
        let error = &descriptor.errors()[0];
        let mut custom = error.selector().to_vec();
        custom.extend(
            DynSolValue::Tuple(vec![
                DynSolValue::Address(who),
                DynSolValue::Uint(U256::from(3), 8),
            ])
            .abi_encode_params(),
        );
        assert_eq!(
            descriptor.decode_revert(&custom),
            RevertReason::Custom {
                name: "NotReader".to_string(),
                args: vec![
                    DynSolValue::Address(who),
                    DynSolValue::Uint(U256::from(3), 8)
                ],
            }
        );

        assert_eq!(
            descriptor.decode_revert(&hex!("deadbeef")),
            RevertReason::Raw(Bytes::from_static(&hex!("deadbeef")))
        );
        assert_eq!(descriptor.decode_revert(&[]), RevertReason::Unknown);
    }

    #[test]
    fn test_function_codec() {
        let json = r#"[
            {"type":"function","name":"getOrdersStatus","stateMutability":"view",
             "inputs":[{"name":"orderHashes","type":"bytes32[]"}],
             "outputs":[{"name":"","type":"tuple[]","components":[
                {"name":"status","type":"uint8"},{"name":"filledAmount","type":"uint256"}]}]}
        ]"#;
        let descriptor = Descriptor::from_json(json).unwrap();
        let f = descriptor.function("getOrdersStatus").unwrap();
        assert_eq!(f.signature(), "getOrdersStatus(bytes32[])");
        assert!(f.is_read_only());

        let args = vec![DynSolValue::Array(vec![
            DynSolValue::FixedBytes(B256::repeat_byte(0x11), 32),
            DynSolValue::FixedBytes(B256::repeat_byte(0x22), 32),
        ])];
        let calldata = f.encode_input(&args).unwrap();
        assert_eq!(&calldata[..4], f.selector().as_slice());
        // selector + offset + length + 2 words
        assert_eq!(calldata.len(), 4 + 32 * 4);
        assert_eq!(f.decode_input(&calldata).unwrap(), args);

        let statuses = DynSolValue::Array(vec![
            DynSolValue::Tuple(vec![
                DynSolValue::Uint(U256::from(1), 8),
                DynSolValue::Uint(U256::from(500), 256),
            ]),
            DynSolValue::Tuple(vec![
                DynSolValue::Uint(U256::from(2), 8),
                DynSolValue::Uint(U256::ZERO, 256),
            ]),
        ]);
        let returned = DynSolValue::Tuple(vec![statuses.clone()]).abi_encode_params();
        let output = f.decode_output(&returned).unwrap();
        assert_eq!(output.into_single().unwrap(), statuses);

        assert!(matches!(f.decode_output(&returned[..40]), Err(Error::Decoding(_))));
        assert!(matches!(
            f.encode_input(&[DynSolValue::Address(Address::ZERO)]),
            Err(Error::Encoding(_))
        ));
    }
}
