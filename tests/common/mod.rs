//! Shared fixture generators for the end-to-end tests.
//!
//! Import from any integration test file with:
//!   `#[path = "common/mod.rs"] mod common;`

use std::fs;
use std::path::Path;

use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small ASP.NET-style service: controller → validator/service, and a
/// repository reached through an injected interface.
pub fn csharp_simple() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "Controllers/AbsenceController.cs",
        r#"using App.Services;
using App.Validation;

namespace App.Controllers
{
    public class AbsenceController
    {
        private readonly LeaveRequestValidator _validator;
        private readonly AbsenceService _service;

        public AbsenceController(LeaveRequestValidator validator, AbsenceService service)
        {
            _validator = validator;
            _service = service;
        }

        [HttpPost]
        public int SubmitRequest(int employeeId)
        {
            _validator.ValidateRequest(employeeId);
            return _service.CalculateEntitlement(employeeId);
        }
    }
}
"#,
    );
    write(
        root,
        "Validation/LeaveRequestValidator.cs",
        r#"namespace App.Validation
{
    public class LeaveRequestValidator
    {
        public bool ValidateRequest(int employeeId)
        {
            return employeeId > 0;
        }
    }
}
"#,
    );
    write(
        root,
        "Services/AbsenceService.cs",
        r#"using App.Data;

namespace App.Services
{
    public class AbsenceService
    {
        private readonly IAbsenceRepository _repository;

        public AbsenceService(IAbsenceRepository repository)
        {
            _repository = repository;
        }

        public int CalculateEntitlement(int employeeId)
        {
            return 25 - _repository.GetDaysTaken(employeeId);
        }
    }
}
"#,
    );
    write(
        root,
        "Data/IAbsenceRepository.cs",
        r#"namespace App.Data
{
    public interface IAbsenceRepository
    {
        int GetDaysTaken(int employeeId);
    }
}
"#,
    );
    write(
        root,
        "Data/AbsenceRepository.cs",
        r#"namespace App.Data
{
    public class AbsenceRepository : IAbsenceRepository
    {
        public int GetDaysTaken(int employeeId)
        {
            return 3;
        }
    }
}
"#,
    );
    dir
}

/// User CRUD slice: controller → service → repository.
pub fn typescript_simple() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "src/controller.ts",
        r#"import { UserService } from "./service";

export class UserController {
    private service: UserService;

    constructor() {
        this.service = new UserService();
    }

    handleCreateUser(name: string) {
        return this.service.createUser(name);
    }
}
"#,
    );
    write(
        root,
        "src/service.ts",
        r#"import { UserRepository } from "./repository";

export class UserService {
    private repository: UserRepository;

    constructor() {
        this.repository = new UserRepository();
    }

    createUser(name: string) {
        return this.repository.save({ name });
    }
}
"#,
    );
    write(
        root,
        "src/repository.ts",
        r#"export class UserRepository {
    save(user: { name: string }) {
        return user;
    }
}
"#,
    );
    dir
}

/// Handlers over a service package, plus a logging leaf that must score
/// below the handlers.
pub fn go_simple() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "go.mod", "module myapp\n\ngo 1.22\n");
    write(
        root,
        "main.go",
        r#"package main

func main() {
	h := NewHandler()
	h.HandleCreate("first")
}
"#,
    );
    write(
        root,
        "handler.go",
        r#"package main

import "myapp/service"

type Handler struct {
	service *service.DataService
	logger  *Logger
}

func NewHandler() *Handler {
	return &Handler{service: service.NewDataService(), logger: &Logger{}}
}

func (h *Handler) HandleCreate(name string) error {
	h.logger.Info("creating")
	return h.service.CreateItem(name)
}

func (h *Handler) HandleGet(id int) (string, error) {
	return h.service.GetItem(id)
}
"#,
    );
    write(
        root,
        "logger.go",
        r#"package main

type Logger struct{}

func (l *Logger) Info(msg string) {}
"#,
    );
    write(
        root,
        "service/data.go",
        r#"package service

type DataService struct {
	items map[int]string
}

func NewDataService() *DataService {
	return &DataService{items: map[int]string{}}
}

func (d *DataService) CreateItem(name string) error {
	d.items[len(d.items)] = name
	return nil
}

func (d *DataService) GetItem(id int) (string, error) {
	return d.items[id], nil
}
"#,
    );
    dir
}

/// Quoted-include resolution with a paired header/source and a cross-file
/// fuzzy target.
pub fn c_simple() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "main.c",
        r#"#include "service.h"

int handle_request(int id) {
    log_message("handling request");
    return get_item(id);
}
"#,
    );
    write(
        root,
        "service.h",
        r#"int get_item(int id);
"#,
    );
    write(
        root,
        "service.c",
        r#"#include "service.h"

int get_item(int id) {
    return id * 2;
}
"#,
    );
    write(
        root,
        "types.c",
        r#"void log_message(const char *msg) {
    (void)msg;
}
"#,
    );
    dir
}

/// VB module → class → repository chain using the `Call` keyword.
pub fn vbnet_simple() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "EmployeeModule.vb",
        r#"Namespace Acme.Hr
    Public Module EmployeeModule
        Public Sub LoadEmployee(id As Integer)
            Dim svc As New EmployeeService()
            Call svc.GetEmployee(id)
        End Sub
    End Module
End Namespace
"#,
    );
    write(
        root,
        "EmployeeService.vb",
        r#"Namespace Acme.Hr
    Public Class EmployeeService
        Private repo As New EmployeeRepository()

        Public Function GetEmployee(id As Integer) As String
            Return repo.FindById(id)
        End Function
    End Class
End Namespace
"#,
    );
    write(
        root,
        "EmployeeRepository.vb",
        r#"Namespace Acme.Hr
    Public Class EmployeeRepository
        Public Function FindById(id As Integer) As String
            Return "employee"
        End Function
    End Class
End Namespace
"#,
    );
    dir
}
