//! Almacén de documentos en memoria. Los documentos viven sólo mientras el
//! proceso está en marcha; se conserva el orden de subida porque el filtro
//! por palabras clave selecciona los primeros que coinciden.

use std::sync::Mutex;

/// Documento subido por el usuario.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub content: String,
}

impl Document {
    /// Tamaño del contenido almacenado, en bytes UTF-8.
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    /// Extensión del nombre (tras el último punto); "txt" si no hay punto.
    pub fn doc_type(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("txt")
    }
}

/// Colección de documentos protegida por mutex, compartida entre handlers.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: Mutex<Vec<Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` si ya existe un documento con ese nombre.
    pub fn contains(&self, name: &str) -> bool {
        self.docs.lock().unwrap().iter().any(|d| d.name == name)
    }

    /// Inserta un documento nuevo. Devuelve `false` si el nombre ya existe;
    /// en ese caso el contenido previo queda intacto.
    pub fn insert(&self, doc: Document) -> bool {
        let mut docs = self.docs.lock().unwrap();
        if docs.iter().any(|d| d.name == doc.name) {
            return false;
        }
        docs.push(doc);
        true
    }

    /// Elimina un documento por nombre. Devuelve `true` si existía.
    pub fn remove(&self, name: &str) -> bool {
        let mut docs = self.docs.lock().unwrap();
        let before = docs.len();
        docs.retain(|d| d.name != name);
        docs.len() != before
    }

    /// Copia instantánea de todos los documentos, en orden de subida.
    pub fn snapshot(&self) -> Vec<Document> {
        self.docs.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.lock().unwrap().is_empty()
    }
}
