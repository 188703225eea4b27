//! GraphQL documents for metaobject definitions and entries.

pub const METAOBJECT_DEFINITIONS: &str = r#"
query MetaobjectDefinitions($first: Int!, $after: String) {
  metaobjectDefinitions(first: $first, after: $after) {
    edges {
      cursor
      node {
        id
        name
        type
        fieldDefinitions {
          key
          name
          description
          required
          type { name }
          validations { name value }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

pub const METAOBJECTS: &str = r#"
query Metaobjects($type: String!, $first: Int!, $after: String) {
  metaobjects(type: $type, first: $first, after: $after) {
    edges {
      cursor
      node {
        id
        handle
        type
        displayName
        fields { key value type }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

pub const METAOBJECT_DEFINITION_CREATE: &str = r#"
mutation MetaobjectDefinitionCreate($definition: MetaobjectDefinitionCreateInput!) {
  metaobjectDefinitionCreate(definition: $definition) {
    metaobjectDefinition { id type }
    userErrors { field message code }
  }
}
"#;

pub const METAOBJECT_CREATE: &str = r#"
mutation MetaobjectCreate($metaobject: MetaobjectCreateInput!) {
  metaobjectCreate(metaobject: $metaobject) {
    metaobject { id handle }
    userErrors { field message code }
  }
}
"#;

pub const METAOBJECT_UPDATE: &str = r#"
mutation MetaobjectUpdate($id: ID!, $metaobject: MetaobjectUpdateInput!) {
  metaobjectUpdate(id: $id, metaobject: $metaobject) {
    metaobject { id handle }
    userErrors { field message code }
  }
}
"#;
