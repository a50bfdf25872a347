use std::collections::BTreeMap;
use std::fmt;

/// Route one named output of a source file into one named input of a consumer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MappingEntry {
    pub consumer: String,
    pub source: String,
    pub output: String,
    pub input: String,
}

impl MappingEntry {
    pub fn new(
        source: impl Into<String>,
        output: impl Into<String>,
        consumer: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            consumer: consumer.into(),
            source: source.into(),
            output: output.into(),
            input: input.into(),
        }
    }

    /// Build from `source output consumer input`, the order used on disk and by `addmapping`
    pub fn from_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> Option<Self> {
        let tokens: Vec<&str> = tokens.collect();
        match tokens.as_slice() {
            [source, output, consumer, input] => Some(Self::new(*source, *output, *consumer, *input)),
            _ => None,
        }
    }
}

impl fmt::Display for MappingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.source, self.output, self.consumer, self.input)
    }
}

type Routes = BTreeMap<String, BTreeMap<String, String>>;

/// consumer -> source -> output -> input
///
/// Each level is keyed, so a consumer maps any given source output at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    consumers: BTreeMap<String, Routes>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry`; returns the input the same source output was mapped to before
    pub fn insert(&mut self, entry: MappingEntry) -> Option<String> {
        self.consumers
            .entry(entry.consumer)
            .or_default()
            .entry(entry.source)
            .or_default()
            .insert(entry.output, entry.input)
    }

    pub fn remove(&mut self, consumer: &str, source: &str, output: &str) -> Option<String> {
        let routes = self.consumers.get_mut(consumer)?;
        let outputs = routes.get_mut(source)?;
        let input = outputs.remove(output)?;
        if outputs.is_empty() {
            routes.remove(source);
        }
        if routes.is_empty() {
            self.consumers.remove(consumer);
        }
        Some(input)
    }

    /// Entries whose consumer is `consumer`
    pub fn for_consumer<'a>(&'a self, consumer: &'a str) -> impl Iterator<Item = MappingEntry> + 'a {
        self.consumers
            .get_key_value(consumer)
            .into_iter()
            .flat_map(|(consumer, routes)| flatten(consumer, routes))
    }

    pub fn entries(&self) -> impl Iterator<Item = MappingEntry> + '_ {
        self.consumers
            .iter()
            .flat_map(|(consumer, routes)| flatten(consumer, routes))
    }

    pub fn consumers(&self) -> impl Iterator<Item = &str> {
        self.consumers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.consumers
            .values()
            .flat_map(|routes| routes.values())
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

fn flatten<'a>(consumer: &'a str, routes: &'a Routes) -> impl Iterator<Item = MappingEntry> + 'a {
    routes.iter().flat_map(move |(source, outputs)| {
        outputs
            .iter()
            .map(move |(output, input)| MappingEntry::new(source, output, consumer, input))
    })
}

impl FromIterator<MappingEntry> for MappingTable {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}
