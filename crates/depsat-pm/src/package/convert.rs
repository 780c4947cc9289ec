//! Conversions between scenario package entries and Package.

use super::Package;
use crate::scenario::PackageEntry;

impl From<&PackageEntry> for Package {
    fn from(entry: &PackageEntry) -> Self {
        let mut pkg = Package::new(&entry.name, &entry.version);
        if let Some(ref package_type) = entry.package_type {
            pkg.package_type = package_type.clone();
        }
        pkg.require = entry.require.clone();
        pkg.conflict = entry.conflict.clone();
        pkg.provide = entry.provide.clone();
        pkg.replace = entry.replace.clone();
        pkg.recommend = entry.recommend.clone();
        pkg.suggest = entry.suggest.clone();
        pkg.source = entry.source.clone();
        pkg.dist = entry.dist.clone();
        pkg
    }
}

impl From<PackageEntry> for Package {
    fn from(entry: PackageEntry) -> Self {
        Package::from(&entry)
    }
}

impl From<&Package> for PackageEntry {
    fn from(pkg: &Package) -> Self {
        PackageEntry {
            name: pkg.name.clone(),
            version: pkg.pretty_version().to_string(),
            package_type: if pkg.package_type == "library" {
                None
            } else {
                Some(pkg.package_type.clone())
            },
            require: pkg.require.clone(),
            conflict: pkg.conflict.clone(),
            provide: pkg.provide.clone(),
            replace: pkg.replace.clone(),
            recommend: pkg.recommend.clone(),
            suggest: pkg.suggest.clone(),
            source: pkg.source.clone(),
            dist: pkg.dist.clone(),
        }
    }
}
