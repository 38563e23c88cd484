use crate::types::{AsyncTool, AsyncToolWrapper, Tool};

use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use schemars::JsonSchema;
use schemars::schema::{Schema, SchemaObject};
use schemars::schema_for;
use serde::de::Deserialize;
use serde_json::Error as JsonError;
use serde_json::{Map, Value};
use thiserror::Error;

type ToolTraitObject<T> = Box<dyn Tool<Context = T> + Send + Sync>;
type Deserializer<T> = Box<dyn Fn(&str) -> Result<ToolTraitObject<T>, serde_json::Error>>;

type AsyncToolTraitObject<T> = Box<dyn AsyncTool<Context = T>>;
type AsyncDeserializer<T> = Box<dyn Fn(&str) -> Result<AsyncToolTraitObject<T>, serde_json::Error>>;

pub type SyncToolObject<Context> = ToolObject<Deserializer<Context>>;
pub type AsyncToolObject<Context> = ToolObject<AsyncDeserializer<Context>>;

/// Keywords of the JSON schema subset accepted by Gemini function declarations.
const GEMINI_SCHEMA_KEYS: &[&str] = &[
    "type",
    "description",
    "properties",
    "required",
    "items",
    "enum",
    "nullable",
];

pub struct ToolObject<T> {
    /// `None` when the tool takes no arguments.
    pub parameters: Option<Value>,
    pub description: String,
    pub name: String,
    deserializer: T,
}

impl<C> ToolObject<AsyncDeserializer<C>> {
    pub fn try_deserialize(
        &self,
        data: &str,
    ) -> Result<AsyncToolTraitObject<C>, serde_json::Error> {
        let deserializer = &self.deserializer;
        deserializer(data)
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("tool `{0}` is missing a title or description")]
    MissingMetadata(String),
    #[error("could not convert to json")]
    JsonSerialization(#[source] JsonError),
}

impl<T> From<&ToolObject<T>> for ChatCompletionTool {
    fn from(value: &ToolObject<T>) -> Self {
        Self {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: value.name.clone(),
                description: Some(value.description.clone()),
                parameters: value.parameters.clone(),
                strict: None,
            },
        }
    }
}

impl<C> ToolObject<Deserializer<C>> {
    pub fn try_from_tool<T>() -> Result<Self, ValidationError>
    where
        T: JsonSchema + Tool<Context = C> + Send + Sync + for<'de> Deserialize<'de> + 'static,
    {
        let (name, description, parameters) = describe::<T>()?;

        let deserializer = Box::new(|data: &str| {
            serde_json::from_str::<T>(data)
                .map(|tool| Box::new(tool) as Box<dyn Tool<Context = C> + Send + Sync>)
        });

        Ok(Self {
            name,
            parameters,
            description,
            deserializer,
        })
    }
}

impl<C> ToolObject<AsyncDeserializer<C>> {
    pub fn try_from_tool<T>() -> Result<Self, ValidationError>
    where
        T: JsonSchema + AsyncTool<Context = C> + for<'de> Deserialize<'de> + 'static,
    {
        let (name, description, parameters) = describe::<T>()?;

        let deserializer = Box::new(|data: &str| {
            serde_json::from_str::<T>(data)
                .map(|tool| Box::new(tool) as Box<dyn AsyncTool<Context = C>>)
        });

        Ok(Self {
            name,
            parameters,
            description,
            deserializer,
        })
    }
}

impl<C> From<SyncToolObject<C>> for AsyncToolObject<C>
where
    C: Send + Sync + 'static,
{
    fn from(value: SyncToolObject<C>) -> Self {
        let async_deserializer = Box::new(move |json: &str| {
            (value.deserializer)(json).map(|trait_obj| {
                Box::new(AsyncToolWrapper { tool: trait_obj }) as AsyncToolTraitObject<C>
            })
        });
        Self {
            description: value.description,
            parameters: value.parameters,
            name: value.name,
            deserializer: async_deserializer,
        }
    }
}

fn describe<T: JsonSchema>() -> Result<(String, String, Option<Value>), ValidationError> {
    let schema = schema_for!(T);
    let (name, description) = validate_tool_schema(&schema.schema)?;
    let json_schema =
        serde_json::to_value(&schema.schema).map_err(ValidationError::JsonSerialization)?;
    Ok((name, description, parameters_schema(&json_schema)))
}

/// Reduces a generated schema to the declaration Gemini accepts. Tools
/// without properties declare no parameters at all.
fn parameters_schema(schema: &Value) -> Option<Value> {
    let has_properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|properties| !properties.is_empty());
    if !has_properties {
        return None;
    }
    let mut reduced = reduce_schema(schema);
    // the description already travels on the function itself
    if let Value::Object(map) = &mut reduced {
        map.remove("description");
    }
    Some(reduced)
}

fn reduce_schema(schema: &Value) -> Value {
    let Value::Object(object) = schema else {
        return schema.clone();
    };
    let mut reduced = Map::new();
    for (key, value) in object {
        if !GEMINI_SCHEMA_KEYS.contains(&key.as_str()) {
            continue;
        }
        match (key.as_str(), value) {
            ("type", Value::Array(types)) => {
                // ["string", "null"] becomes a nullable string
                let concrete = types.iter().find(|t| t.as_str() != Some("null"));
                if let Some(concrete) = concrete {
                    reduced.insert("type".to_string(), concrete.clone());
                }
                if types.len() > 1 {
                    reduced.insert("nullable".to_string(), Value::Bool(true));
                }
            }
            ("properties", Value::Object(properties)) => {
                let properties = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), reduce_schema(schema)))
                    .collect();
                reduced.insert(key.clone(), Value::Object(properties));
            }
            ("items", items) => {
                reduced.insert(key.clone(), reduce_schema(items));
            }
            _ => {
                reduced.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(reduced)
}

fn validate_tool_schema(schema: &SchemaObject) -> Result<(String, String), ValidationError> {
    let name = schema
        .metadata
        .as_deref()
        .and_then(|metadata| metadata.title.as_deref())
        .ok_or_else(|| ValidationError::MissingMetadata("<untitled>".to_string()))?
        .to_string();

    let description = validate_tool_description(&name, schema)?;
    Ok((name, description))
}

// this could probably be converted to a compile-time check with a macro
fn validate_tool_description(name: &str, schema: &SchemaObject) -> Result<String, ValidationError> {
    // validate description on subschema
    let description = schema
        .metadata
        .as_deref()
        .and_then(|metadata| metadata.description.as_deref())
        .ok_or_else(|| ValidationError::MissingMetadata(name.to_string()))?;

    if let Some(object) = schema.object.as_deref() {
        for sub_schema in object.properties.values() {
            if let Schema::Object(sub_schema_object) = sub_schema {
                validate_tool_description(name, sub_schema_object)?;
            }
        }
    }

    Ok(description.to_string())
}
