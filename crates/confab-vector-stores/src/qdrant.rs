//! Qdrant vector store implementation.

use async_trait::async_trait;
use std::collections::HashMap;

use confab_core::error::{ConfabError, ConfabResult};
use confab_core::traits::{
    CollectionSpec, DistanceMetric, PointSelector, ScrollPage, ScrollRequest, VectorRecord,
    VectorStore, VectorStoreConfig,
};
use confab_core::types::{Filter, FilterCondition};

use qdrant_client::qdrant::{
    condition::ConditionOneOf, point_id::PointIdOptions, r#match::MatchValue,
    vectors_output::VectorsOptions, Condition, CreateCollectionBuilder, DeletePointsBuilder,
    Distance, FieldCondition, Filter as QdrantFilter, GetPointsBuilder, Match, PointId,
    PointStruct, PointsIdsList, RetrievedPoint,
    ScrollPointsBuilder, SetPayloadPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};

const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Qdrant vector store implementation.
///
/// Payload keys are stored as-is, so `metadata.<key>` filters address the
/// nested metadata object directly.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store.
    pub async fn new(config: VectorStoreConfig) -> ConfabResult<Self> {
        let url = config
            .config
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_QDRANT_URL);

        let api_key = config.config.get("api_key").and_then(|v| v.as_str());

        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(|e| {
            ConfabError::vector_store_connection(format!("Failed to create Qdrant client: {}", e))
        })?;

        tracing::info!(url, "Connected to Qdrant");
        Ok(Self { client })
    }

    fn distance_to_qdrant(metric: DistanceMetric) -> Distance {
        match metric {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::Euclidean => Distance::Euclid,
            DistanceMetric::DotProduct => Distance::Dot,
        }
    }

    /// Map a client error, recognising unknown collections.
    fn map_error(collection: &str, action: &str, err: QdrantError) -> ConfabError {
        Self::classify(collection, action, err.to_string())
    }

    fn classify(collection: &str, action: &str, message: String) -> ConfabError {
        if message.contains("doesn't exist") || message.contains("Not found: Collection") {
            return ConfabError::collection_not_found(collection);
        }
        if message.contains("Unavailable") || message.contains("transport error") {
            return ConfabError::vector_store_connection(format!("Failed to {}: {}", action, message));
        }
        ConfabError::vector_store(format!("Failed to {}: {}", action, message))
    }

    fn map_overwrite_error(collection: &str, id: &str, message: String) -> ConfabError {
        if message.contains("No point with id") {
            return ConfabError::point_not_found(collection, id);
        }
        Self::classify(collection, "overwrite payload", message)
    }

    fn payload_to_hashmap(payload: HashMap<String, Value>) -> HashMap<String, serde_json::Value> {
        payload
            .into_iter()
            .map(|(k, v)| (k, Self::qdrant_value_to_json(v)))
            .collect()
    }

    fn hashmap_to_payload(payload: HashMap<String, serde_json::Value>) -> Payload {
        let fields: HashMap<String, Value> = payload
            .into_iter()
            .map(|(k, v)| (k, Self::json_to_qdrant_value(v)))
            .collect();
        Payload::from(fields)
    }

    fn qdrant_value_to_json(value: Value) -> serde_json::Value {
        use qdrant_client::qdrant::value::Kind;
        match value.kind {
            Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
            Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
            Some(Kind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Some(Kind::StringValue(s)) => serde_json::Value::String(s),
            Some(Kind::ListValue(list)) => serde_json::Value::Array(
                list.values
                    .into_iter()
                    .map(Self::qdrant_value_to_json)
                    .collect(),
            ),
            Some(Kind::StructValue(s)) => serde_json::Value::Object(
                s.fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::qdrant_value_to_json(v)))
                    .collect(),
            ),
        }
    }

    fn json_to_qdrant_value(value: serde_json::Value) -> Value {
        use qdrant_client::qdrant::value::Kind;
        use qdrant_client::qdrant::{ListValue, Struct};

        let kind = match value {
            serde_json::Value::Null => Kind::NullValue(0),
            serde_json::Value::Bool(b) => Kind::BoolValue(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Kind::IntegerValue(i)
                } else if let Some(f) = n.as_f64() {
                    Kind::DoubleValue(f)
                } else {
                    Kind::NullValue(0)
                }
            }
            serde_json::Value::String(s) => Kind::StringValue(s),
            serde_json::Value::Array(arr) => Kind::ListValue(ListValue {
                values: arr.into_iter().map(Self::json_to_qdrant_value).collect(),
            }),
            serde_json::Value::Object(obj) => Kind::StructValue(Struct {
                fields: obj
                    .into_iter()
                    .map(|(k, v)| (k, Self::json_to_qdrant_value(v)))
                    .collect(),
            }),
        };

        Value { kind: Some(kind) }
    }

    fn convert_filter(filter: &Filter) -> QdrantFilter {
        match filter {
            Filter::Condition(cond) => Self::condition_filter(cond),
            Filter::And(filters) => QdrantFilter {
                must: filters.iter().map(Self::nested).collect(),
                ..Default::default()
            },
            Filter::Not(inner) => QdrantFilter {
                must_not: vec![Self::nested(inner)],
                ..Default::default()
            },
        }
    }

    fn nested(filter: &Filter) -> Condition {
        Condition {
            condition_one_of: Some(ConditionOneOf::Filter(Self::convert_filter(filter))),
        }
    }

    fn field(key: &str, build: impl FnOnce(&mut FieldCondition)) -> Condition {
        let mut field_condition = FieldCondition {
            key: key.to_string(),
            ..Default::default()
        };
        build(&mut field_condition);
        Condition {
            condition_one_of: Some(ConditionOneOf::Field(field_condition)),
        }
    }

    fn condition_filter(cond: &FilterCondition) -> QdrantFilter {
        let matcher = Self::value_to_match(&cond.value);
        QdrantFilter {
            must: vec![Self::field(&cond.field, |f| f.r#match = Some(matcher))],
            ..Default::default()
        }
    }

    fn value_to_match(value: &serde_json::Value) -> Match {
        let match_value = match value {
            serde_json::Value::String(s) => Some(MatchValue::Keyword(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(MatchValue::Integer),
            serde_json::Value::Bool(b) => Some(MatchValue::Boolean(*b)),
            _ => None,
        };
        Match { match_value }
    }

    fn extract_point_id(point_id: Option<PointId>) -> String {
        match point_id {
            Some(PointId {
                point_id_options: Some(PointIdOptions::Uuid(uuid)),
            }) => uuid,
            Some(PointId {
                point_id_options: Some(PointIdOptions::Num(num)),
            }) => num.to_string(),
            _ => String::new(),
        }
    }

    fn to_point_id(id: &str) -> PointId {
        match id.parse::<u64>() {
            Ok(num) => num.into(),
            Err(_) => id.into(),
        }
    }

    fn to_record(point: RetrievedPoint) -> VectorRecord {
        let vector = match point.vectors.and_then(|v| v.vectors_options) {
            Some(VectorsOptions::Vector(v)) => v.data,
            _ => vec![],
        };
        VectorRecord {
            id: Self::extract_point_id(point.id),
            vector,
            payload: Self::payload_to_hashmap(point.payload),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, spec: &CollectionSpec) -> ConfabResult<()> {
        if self.collection_exists(&spec.name).await? {
            return Ok(());
        }

        tracing::info!(
            collection = %spec.name,
            dimension = spec.dimension,
            embedder = %spec.embedder_name,
            "Creating Qdrant collection"
        );
        let request = CreateCollectionBuilder::new(spec.name.as_str()).vectors_config(
            VectorParamsBuilder::new(spec.dimension as u64, Self::distance_to_qdrant(spec.distance)),
        );

        self.client
            .create_collection(request)
            .await
            .map_err(|e| Self::map_error(&spec.name, "create collection", e))?;

        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> ConfabResult<bool> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| Self::map_error(name, "check collection", e))
    }

    async fn insert(&self, collection: &str, records: Vec<VectorRecord>) -> ConfabResult<()> {
        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                let id = Self::to_point_id(&record.id);
                PointStruct::new(id, record.vector, Self::hashmap_to_payload(record.payload))
            })
            .collect();

        let request = UpsertPointsBuilder::new(collection, points).wait(true);

        self.client
            .upsert_points(request)
            .await
            .map_err(|e| Self::map_error(collection, "insert points", e))?;

        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        request: ScrollRequest,
    ) -> ConfabResult<ScrollPage> {
        let mut builder = ScrollPointsBuilder::new(collection)
            .limit(request.limit.max(1) as u32)
            .with_payload(true)
            .with_vectors(request.with_vectors);

        if let Some(f) = filter {
            builder = builder.filter(Self::convert_filter(f));
        }
        if let Some(offset) = request.offset.as_deref() {
            builder = builder.offset(Self::to_point_id(offset));
        }

        let response = self
            .client
            .scroll(builder)
            .await
            .map_err(|e| Self::map_error(collection, "scroll points", e))?;

        let next_offset = response
            .next_page_offset
            .map(|id| Self::extract_point_id(Some(id)))
            .filter(|id| !id.is_empty());

        Ok(ScrollPage {
            records: response.result.into_iter().map(Self::to_record).collect(),
            next_offset,
        })
    }

    async fn retrieve(
        &self,
        collection: &str,
        ids: &[String],
        with_vectors: bool,
    ) -> ConfabResult<Vec<VectorRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let point_ids: Vec<PointId> = ids.iter().map(|id| Self::to_point_id(id)).collect();
        let request = GetPointsBuilder::new(collection, point_ids)
            .with_payload(true)
            .with_vectors(with_vectors);

        let response = self
            .client
            .get_points(request)
            .await
            .map_err(|e| Self::map_error(collection, "retrieve points", e))?;

        Ok(response.result.into_iter().map(Self::to_record).collect())
    }

    async fn overwrite_payload(
        &self,
        collection: &str,
        id: &str,
        payload: HashMap<String, serde_json::Value>,
    ) -> ConfabResult<()> {
        let request = SetPayloadPointsBuilder::new(collection, Self::hashmap_to_payload(payload))
            .points_selector(PointsIdsList {
                ids: vec![Self::to_point_id(id)],
            })
            .wait(true);

        self.client
            .overwrite_payload(request)
            .await
            .map_err(|e| Self::map_overwrite_error(collection, id, e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, collection: &str, selector: PointSelector) -> ConfabResult<()> {
        let request = match selector {
            PointSelector::Ids(ids) => {
                if ids.is_empty() {
                    return Ok(());
                }
                let point_ids: Vec<PointId> = ids.iter().map(|id| Self::to_point_id(id)).collect();
                DeletePointsBuilder::new(collection).points(point_ids)
            }
            PointSelector::Filter(filter) => {
                DeletePointsBuilder::new(collection).points(Self::convert_filter(&filter))
            }
        }
        .wait(true);

        self.client
            .delete_points(request)
            .await
            .map_err(|e| Self::map_error(collection, "delete points", e))?;

        Ok(())
    }
}
