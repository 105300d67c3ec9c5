// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resolve operation names into typed references.
//!
//! Services return the name of a long-running operation as a string, such as
//! `projects/my-project/locations/us-central1/operations/operation-123`. The
//! types in this module validate these names against the path template of the
//! operations collection, and extract the template parameters.

use crate::Result;
use crate::error::Error;
use crate::status::Operation;

/// The roots of the Google Cloud resource hierarchy.
const HIERARCHY_ROOTS: [&str; 4] = ["projects", "organizations", "folders", "billingAccounts"];

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter(String),
}

/// A collection of operations, such as `projects.locations.operations`.
///
/// # Example
/// ```
/// # use cloudsdk_lro::Collection;
/// let collection = Collection::new("eventarc.projects.locations.operations");
/// assert_eq!(collection.api_name(), Some("eventarc"));
/// assert_eq!(
///     collection.template(),
///     "projects/{projectsId}/locations/{locationsId}/operations/{operationsId}"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collection {
    full_name: String,
    api_name: Option<String>,
    segments: Vec<Segment>,
}

impl Collection {
    /// Creates a collection, deriving the path template from its name.
    ///
    /// Each dot-separated segment of the collection path becomes a literal
    /// path segment followed by a `{<segment>Id}` parameter. A leading API
    /// name is recognized when the segment that follows it is the root of
    /// the resource hierarchy, e.g. `projects`.
    pub fn new<T: Into<String>>(full_name: T) -> Self {
        let full_name = full_name.into();
        let parts = full_name.split('.').collect::<Vec<_>>();
        let (api_name, path) = match parts.as_slice() {
            [first, second, ..]
                if !HIERARCHY_ROOTS.contains(first) && HIERARCHY_ROOTS.contains(second) =>
            {
                (Some(first.to_string()), &parts[1..])
            }
            _ => (None, parts.as_slice()),
        };
        let segments = path
            .iter()
            .filter(|s| !s.is_empty())
            .flat_map(|s| {
                [
                    Segment::Literal(s.to_string()),
                    Segment::Parameter(format!("{s}Id")),
                ]
            })
            .collect();
        Self {
            full_name,
            api_name,
            segments,
        }
    }

    /// Creates a collection with an explicit path template.
    ///
    /// Use this for collections whose paths do not follow the naming
    /// convention, e.g. `projects/{project}/global/operations/{operation}`.
    /// Template segments in braces are parameters, all other segments are
    /// literals.
    pub fn with_template<N: Into<String>, T: AsRef<str>>(full_name: N, template: T) -> Self {
        let segments = template
            .as_ref()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(p) => Segment::Parameter(p.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        let full_name = full_name.into();
        let api_name = Self::new(full_name.as_str()).api_name;
        Self {
            full_name,
            api_name,
            segments,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn api_name(&self) -> Option<&str> {
        self.api_name.as_deref()
    }

    /// The path template, e.g. `projects/{projectsId}/operations/{operationsId}`.
    pub fn template(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => l.clone(),
                Segment::Parameter(p) => format!("{{{p}}}"),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name)
    }
}

/// Identifies a single long-running operation.
///
/// References are immutable. The only way to create one is to parse a name
/// that matches the template of its collection, and [relative_name] renders
/// the same name back.
///
/// [relative_name]: OperationReference::relative_name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationReference {
    collection: Collection,
    parameters: Vec<(String, String)>,
    api_version: Option<String>,
}

impl OperationReference {
    /// Parses an operation name.
    ///
    /// The name may be a relative name, such as
    /// `projects/p/locations/l/operations/o`, or a full URI such as
    /// `https://eventarc.googleapis.com/v1/projects/p/locations/l/operations/o`.
    /// For URIs the path prefix up to, and including, the API version is
    /// ignored.
    ///
    /// # Example
    /// ```
    /// # use cloudsdk_lro::{Collection, OperationReference};
    /// let collection = Collection::new("projects.locations.operations");
    /// let name = "projects/p/locations/l/operations/o";
    /// let reference = OperationReference::parse(name, &collection, Some("v1"))?;
    /// assert_eq!(reference.relative_name(), name);
    /// assert_eq!(reference.get("locationsId"), Some("l"));
    /// # Ok::<(), cloudsdk_lro::Error>(())
    /// ```
    pub fn parse(
        name: &str,
        collection: &Collection,
        api_version: Option<&str>,
    ) -> Result<Self> {
        let malformed = || Error::MalformedOperationName {
            name: name.to_string(),
            collection: collection.full_name().to_string(),
            template: collection.template(),
        };
        let relative = match Self::strip_uri(name, api_version) {
            Some(path) => path,
            None if name.contains("://") => return Err(malformed()),
            None => name.to_string(),
        };
        let parts = relative.split('/').collect::<Vec<_>>();
        if relative.is_empty() || parts.len() != collection.segments.len() {
            return Err(malformed());
        }
        let mut parameters = Vec::new();
        for (part, segment) in parts.iter().zip(collection.segments.iter()) {
            match segment {
                Segment::Literal(l) if l == part => {}
                Segment::Literal(_) => return Err(malformed()),
                Segment::Parameter(_) if part.is_empty() => return Err(malformed()),
                Segment::Parameter(p) => parameters.push((p.clone(), part.to_string())),
            }
        }
        Ok(Self {
            collection: collection.clone(),
            parameters,
            api_version: api_version.map(str::to_string),
        })
    }

    // Returns the path of an `http(s)` URI, without the API version prefix.
    fn strip_uri(name: &str, api_version: Option<&str>) -> Option<String> {
        if !(name.starts_with("https://") || name.starts_with("http://")) {
            return None;
        }
        let url = url::Url::parse(name).ok()?;
        let path = url.path().trim_start_matches('/');
        let path = match api_version {
            Some(v) => path
                .strip_prefix(v)
                .and_then(|p| p.strip_prefix('/'))
                .unwrap_or(path),
            None => path,
        };
        Some(path.to_string())
    }

    /// The name of the operation, relative to the service endpoint.
    pub fn relative_name(&self) -> String {
        let mut values = self.parameters.iter().map(|(_, v)| v.as_str());
        self.collection
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                Segment::Parameter(_) => values.next(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// The value of a template parameter, e.g. `get("projectsId")`.
    pub fn get(&self, parameter: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == parameter)
            .map(|(_, v)| v.as_str())
    }

    /// All the template parameters, in template order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The last path parameter, typically the operation id.
    pub fn operation_id(&self) -> Option<&str> {
        self.parameters.last().map(|(_, v)| v.as_str())
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }
}

impl std::fmt::Display for OperationReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.relative_name())
    }
}

/// Resolves the operation returned by a mutating RPC into a reference.
pub fn resolve(
    payload: &Operation,
    collection: &Collection,
    api_version: Option<&str>,
) -> Result<OperationReference> {
    OperationReference::parse(&payload.name, collection, api_version)
}
